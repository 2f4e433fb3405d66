use alloc::{borrow::ToOwned as _, format, string::String, vec::Vec};
use tracing::{debug, error, info_span};

use crate::{
    any::TypeInfo,
    container::Container,
    dependency::{AnnotatedParameter, Annotation},
    errors::{ParameterErrorKind, ValidationErrorKind},
    lifetime::Lifetime,
    parameter::{ParameterBag, ParameterReference},
    registry::Registry,
};

/// Checks every registration: its dependencies exist, a singleton depends only on singletons
/// and no services depend on each other in a cycle.
///
/// # Errors
/// Returns the first problem found, in registration key order
pub fn assert_dependencies_valid(registry: &Registry, params: &ParameterBag) -> Result<(), ValidationErrorKind> {
    let span = info_span!("validate", services = registry.len());
    let _guard = span.enter();

    for (key, data) in registry.entries() {
        let target = service_target(&key.type_info);
        for parameter in data.dependencies() {
            assert_dependency_exists(registry, params, &target, parameter)?;
            assert_lifetime_valid(registry, &target, data.config().lifetime, parameter)?;
        }
    }

    registry.dfs_detect().map_err(|err| {
        error!("{}", err);
        ValidationErrorKind::from(err)
    })?;

    debug!("Dependencies valid");
    Ok(())
}

/// Checks that the parameter or service an argument asks for is available.
/// Context values are only known once a scope is entered, so they always pass.
///
/// # Errors
/// - Returns [`ValidationErrorKind::UnknownParameter`] if a referenced parameter is missing
/// - Returns [`ValidationErrorKind::IncorrectParameterType`] if a parameter is read as another type than it was put with
/// - Returns [`ValidationErrorKind::UnknownService`] if the service isn't registered
pub fn assert_dependency_exists(
    registry: &Registry,
    params: &ParameterBag,
    target: &str,
    parameter: &AnnotatedParameter,
) -> Result<(), ValidationErrorKind> {
    let result = match &parameter.annotation {
        Annotation::Parameter(reference) => match params.check(reference) {
            Ok(()) => Ok(()),
            Err(ParameterErrorKind::Unknown { name }) => Err(ValidationErrorKind::UnknownParameter {
                position: parameter.position,
                target: target.to_owned(),
                parameter: name,
                expression: match reference {
                    ParameterReference::Template(template) => Some((*template).to_owned()),
                    ParameterReference::Name(_) | ParameterReference::Typed(..) => None,
                },
            }),
            Err(ParameterErrorKind::IncorrectType { name, expected }) => Err(ValidationErrorKind::IncorrectParameterType {
                position: parameter.position,
                target: target.to_owned(),
                parameter: name,
                expected,
            }),
        },
        Annotation::Service(key) => {
            if registry.is_type_with_qualifier_known(&key.type_info, key.qualifier) {
                Ok(())
            } else {
                Err(ValidationErrorKind::UnknownService {
                    position: parameter.position,
                    target: target.to_owned(),
                    dependency: key.type_info,
                    qualifier: key.qualifier,
                })
            }
        }
        Annotation::Context(_) => Ok(()),
    };

    result.map_err(|err| {
        error!("{}", err);
        err
    })
}

/// Checks that a singleton doesn't capture a shorter lived dependency.
/// Context values count as scoped.
///
/// # Errors
/// Returns [`ValidationErrorKind::InvalidLifetime`] if the owner is a singleton and the dependency isn't
pub fn assert_lifetime_valid(
    registry: &Registry,
    target: &str,
    lifetime: Lifetime,
    parameter: &AnnotatedParameter,
) -> Result<(), ValidationErrorKind> {
    if lifetime != Lifetime::Singleton {
        return Ok(());
    }

    let dependency_lifetime = match &parameter.annotation {
        Annotation::Service(key) => registry.lifetime_of(key),
        Annotation::Context(_) => Some(Lifetime::Scoped),
        Annotation::Parameter(_) => None,
    };

    match dependency_lifetime {
        Some(dependency_lifetime) if dependency_lifetime != Lifetime::Singleton => {
            let err = ValidationErrorKind::InvalidLifetime {
                position: parameter.position,
                target: target.to_owned(),
                lifetime: dependency_lifetime,
            };
            error!("{}", err);
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Checks the arguments of a function wrapped for injection and returns them.
/// Only existence is checked, a function has no lifetime of its own.
///
/// # Errors
/// Returns the first argument whose parameter or service is missing
pub fn get_valid_injection_annotated_parameters(
    container: &Container,
    target: &TypeInfo,
    parameters: Vec<AnnotatedParameter>,
) -> Result<Vec<AnnotatedParameter>, ValidationErrorKind> {
    let target = function_target(target);
    for parameter in &parameters {
        assert_dependency_exists(container.registry(), container.params(), &target, parameter)?;
    }
    Ok(parameters)
}

fn service_target(type_info: &TypeInfo) -> String {
    format!("Type {type_info}")
}

fn function_target(type_info: &TypeInfo) -> String {
    format!("Function {type_info}")
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{assert_dependencies_valid, assert_dependency_exists, assert_lifetime_valid};
    use crate::{
        any::ServiceKey,
        dependency::{AnnotatedParameter, Annotation},
        errors::ValidationErrorKind,
        expr,
        inject::{Expr, FromContext, Inject, Param},
        lifetime::Lifetime,
        param,
        parameter::ParameterReference,
        ParameterBag, Registry, TypeInfo,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        vec::Vec,
    };
    use tracing_test::traced_test;

    struct Db;
    struct Session;
    struct Request;

    param!(Url = "url");
    param!(Port = "port");
    expr!(Dsn = "${host}/${name}");

    fn service(position: usize, key: ServiceKey) -> AnnotatedParameter {
        AnnotatedParameter {
            position,
            declared: TypeInfo::of::<Inject<Db>>(),
            annotation: Annotation::Service(key),
        }
    }

    #[test]
    #[traced_test]
    fn test_singleton_depends_on_scoped() {
        let registry = Registry::new()
            .provide(|| Ok(Session), Lifetime::Scoped)
            .provide(|Inject(_): Inject<Session>| Ok(Db), Lifetime::Singleton)
            .finish()
            .unwrap();

        let Err(err) = assert_dependencies_valid(&registry, &ParameterBag::new()) else {
            panic!("singleton must not depend on a scoped service");
        };
        assert!(matches!(
            err,
            ValidationErrorKind::InvalidLifetime {
                position: 0,
                lifetime: Lifetime::Scoped,
                ..
            }
        ));
        assert!(err
            .to_string()
            .ends_with("depends on a service with a 'scoped' lifetime which is not supported. Singletons can only depend on other singletons."));
    }

    #[test]
    #[traced_test]
    fn test_singleton_depends_on_context() {
        let registry = Registry::new()
            .provide(|FromContext(_): FromContext<Request>| Ok(Db), Lifetime::Singleton)
            .finish()
            .unwrap();

        assert!(matches!(
            assert_dependencies_valid(&registry, &ParameterBag::new()),
            Err(ValidationErrorKind::InvalidLifetime { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_unknown_parameter() {
        let registry = Registry::new()
            .provide(|_: Inject<Session>, Param(_, _): Param<String, Url>| Ok(Db), Lifetime::Scoped)
            .provide(|| Ok(Session), Lifetime::Scoped)
            .finish()
            .unwrap();

        let Err(err) = assert_dependencies_valid(&registry, &ParameterBag::new()) else {
            panic!("parameter is missing");
        };
        assert_eq!(
            err.to_string(),
            format!("Parameter '#1' of Type {} depends on an unknown parameter 'url'.", TypeInfo::of::<Db>())
        );
    }

    #[test]
    #[traced_test]
    fn test_incorrect_parameter_type() {
        let registry = Registry::new()
            .provide(|Param(_, _): Param<u32, Port>| Ok(Db), Lifetime::Singleton)
            .finish()
            .unwrap();

        let Err(err) = assert_dependencies_valid(&registry, &ParameterBag::new().with("port", 8080u16)) else {
            panic!("parameter is put with another type");
        };
        assert!(matches!(
            &err,
            ValidationErrorKind::IncorrectParameterType {
                position: 0,
                parameter,
                expected: "u32",
                ..
            } if parameter == "port"
        ));
        assert_eq!(
            err.to_string(),
            format!(
                "Parameter '#0' of Type {} reads parameter 'port' as u32, but it was put with another type.",
                TypeInfo::of::<Db>()
            )
        );

        assert!(assert_dependencies_valid(&registry, &ParameterBag::new().with("port", 8080u32)).is_ok());
    }

    #[test]
    #[traced_test]
    fn test_unknown_parameter_in_expression() {
        let registry = Registry::new()
            .provide(|Expr(_, _): Expr<Dsn>| Ok(Db), Lifetime::Singleton)
            .finish()
            .unwrap();

        let Err(err) = assert_dependencies_valid(&registry, &ParameterBag::new().with("host", "localhost")) else {
            panic!("parameter is missing");
        };
        assert_eq!(
            err.to_string(),
            format!(
                "Parameter '#0' of Type {} depends on an unknown parameter 'name' requested in expression '${{host}}/${{name}}'.",
                TypeInfo::of::<Db>()
            )
        );
    }

    #[test]
    #[traced_test]
    fn test_unknown_service() {
        let registry = Registry::new();
        let Err(err) = assert_dependency_exists(&registry, &ParameterBag::new(), "Type Db", &service(2, ServiceKey::of::<Session>(Some("main"))))
        else {
            panic!("service isn't registered");
        };
        assert_eq!(
            err.to_string(),
            format!("Parameter '#2' of Type Db depends on an unknown service {} with qualifier main.", TypeInfo::of::<Session>())
        );
        assert!(logs_contain("depends on an unknown service"));
    }

    #[test]
    fn test_lifetime_valid() {
        let registry = Registry::new()
            .provide(|| Ok(Session), Lifetime::Transient)
            .provide(|| Ok(Db), Lifetime::Singleton);
        let session = service(0, ServiceKey::of::<Session>(None));
        let db = service(0, ServiceKey::of::<Db>(None));
        let parameter = AnnotatedParameter {
            position: 1,
            declared: TypeInfo::of::<Param<String, Url>>(),
            annotation: Annotation::Parameter(ParameterReference::Name("url")),
        };

        assert!(assert_lifetime_valid(&registry, "Type A", Lifetime::Scoped, &session).is_ok());
        assert!(assert_lifetime_valid(&registry, "Type A", Lifetime::Transient, &session).is_ok());
        assert!(assert_lifetime_valid(&registry, "Type A", Lifetime::Singleton, &db).is_ok());
        assert!(assert_lifetime_valid(&registry, "Type A", Lifetime::Singleton, &parameter).is_ok());
        assert!(matches!(
            assert_lifetime_valid(&registry, "Type A", Lifetime::Singleton, &session),
            Err(ValidationErrorKind::InvalidLifetime {
                lifetime: Lifetime::Transient,
                ..
            })
        ));
    }

    #[test]
    #[traced_test]
    fn test_cyclic_dependency() {
        let registry = Registry::new()
            .provide(|Inject(_): Inject<Session>| Ok(Db), Lifetime::Scoped)
            .provide(|Inject(_): Inject<Db>| Ok(Session), Lifetime::Scoped)
            .finish()
            .unwrap();

        let Err(err) = assert_dependencies_valid(&registry, &ParameterBag::new()) else {
            panic!("cycle should be detected");
        };
        assert!(matches!(err, ValidationErrorKind::CyclicDependency(_)));

        let message = err.to_string();
        let path: Vec<&str> = message
            .strip_prefix("Cyclic dependency detected: ")
            .unwrap()
            .split(" -> ")
            .collect();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], path[2]);
        assert_ne!(path[0], path[1]);
        for type_info in [TypeInfo::of::<Db>(), TypeInfo::of::<Session>()] {
            assert!(path.contains(&type_info.name));
        }
    }

    #[test]
    #[traced_test]
    fn test_cyclic_dependency_path_starts_at_cycle() {
        // `Request` only leads into the cycle, so it's not part of the reported path
        let registry = Registry::new()
            .provide(|Inject(_): Inject<Db>| Ok(Request), Lifetime::Scoped)
            .provide(|Inject(_): Inject<Session>| Ok(Db), Lifetime::Scoped)
            .provide(|Inject(_): Inject<Db>| Ok(Session), Lifetime::Scoped)
            .finish()
            .unwrap();

        let Err(err) = assert_dependencies_valid(&registry, &ParameterBag::new()) else {
            panic!("cycle should be detected");
        };
        let message = err.to_string();
        assert!(!message.contains(TypeInfo::of::<Request>().name));
        assert!(message.contains(&format!("{} -> ", TypeInfo::of::<Db>())));
        assert!(message.contains(&format!("{} -> ", TypeInfo::of::<Session>())));
    }

    #[test]
    #[traced_test]
    fn test_self_dependency() {
        let registry = Registry::new()
            .provide(|Inject(_): Inject<Db>| Ok(Db), Lifetime::Scoped)
            .finish()
            .unwrap();

        let Err(err) = assert_dependencies_valid(&registry, &ParameterBag::new()) else {
            panic!("cycle should be detected");
        };
        assert_eq!(
            err.to_string(),
            format!("Cyclic dependency detected: {0} -> {0}", TypeInfo::of::<Db>())
        );
    }
}

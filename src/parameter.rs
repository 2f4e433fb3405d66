use alloc::{
    borrow::ToOwned as _,
    collections::BTreeMap,
    string::{String, ToString as _},
    sync::Arc,
    vec::Vec,
};
use core::{
    any::{type_name, Any},
    fmt::{self, Debug, Display, Formatter},
};
use parking_lot::Mutex;

use crate::{any::TypeInfo, errors::ParameterErrorKind};

/// Reference to a value of a [`ParameterBag`]: a parameter name, a name with the type it's read as,
/// or a template where each `${name}` is replaced with the parameter's [`Display`] form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParameterReference {
    Name(&'static str),
    Typed(&'static str, TypeInfo),
    Template(&'static str),
}

impl Display for ParameterReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParameterReference::Name(name) | ParameterReference::Typed(name, _) => f.write_str(name),
            ParameterReference::Template(template) => f.write_str(template),
        }
    }
}

trait ParameterValue: Any + Send + Sync {
    fn as_any(&self) -> &(dyn Any + Send + Sync);

    fn render(&self) -> String;
}

impl<T> ParameterValue for T
where
    T: Display + Any + Send + Sync,
{
    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

/// Flat key-value store of configuration parameters.
#[derive(Default)]
pub struct ParameterBag {
    values: BTreeMap<String, Arc<dyn ParameterValue>>,
    interpolated: Mutex<BTreeMap<String, String>>,
}

impl Clone for ParameterBag {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            interpolated: Mutex::new(self.interpolated.lock().clone()),
        }
    }
}

impl Debug for ParameterBag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(name, value)| (name, value.render())))
            .finish()
    }
}

impl ParameterBag {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts a parameter into the bag, replacing the previous value with the same name.
    pub fn put<T>(&mut self, name: impl Into<String>, value: T) -> &mut Self
    where
        T: Display + Send + Sync + 'static,
    {
        self.values.insert(name.into(), Arc::new(value));
        // Cached templates may reference the replaced value
        self.interpolated.get_mut().clear();
        self
    }

    #[inline]
    #[must_use]
    pub fn with<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Display + Send + Sync + 'static,
    {
        self.put(name, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets a copy of the parameter with the given name.
    ///
    /// # Errors
    /// - Returns [`ParameterErrorKind::Unknown`] if there is no parameter with this name
    /// - Returns [`ParameterErrorKind::IncorrectType`] if the parameter was put with another type
    pub fn get<T: Clone + 'static>(&self, name: &str) -> Result<T, ParameterErrorKind> {
        let value = self.values.get(name).ok_or_else(|| ParameterErrorKind::Unknown { name: name.to_owned() })?;
        value
            .as_any()
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ParameterErrorKind::IncorrectType {
                name: name.to_owned(),
                expected: type_name::<T>(),
            })
    }

    /// Replaces each `${name}` placeholder of the template with the parameter value.
    /// An unterminated placeholder is kept as is.
    ///
    /// # Errors
    /// Returns [`ParameterErrorKind::Unknown`] for the first placeholder without a parameter
    pub fn interpolate(&self, template: &str) -> Result<String, ParameterErrorKind> {
        if let Some(result) = self.interpolated.lock().get(template) {
            return Ok(result.clone());
        }

        let mut result = String::with_capacity(template.len());
        for segment in segments(template) {
            match segment {
                Segment::Literal(literal) => result.push_str(literal),
                Segment::Placeholder(name) => {
                    let value = self.values.get(name).ok_or_else(|| ParameterErrorKind::Unknown { name: name.to_owned() })?;
                    result.push_str(&value.render());
                }
            }
        }

        self.interpolated.lock().insert(template.to_owned(), result.clone());
        Ok(result)
    }

    /// Checks that every parameter the reference needs is present.
    /// A typed reference also needs the value to be put with that type.
    ///
    /// # Errors
    /// - Returns [`ParameterErrorKind::Unknown`] with the first missing name
    /// - Returns [`ParameterErrorKind::IncorrectType`] if a typed reference doesn't match the stored value
    pub fn check(&self, reference: &ParameterReference) -> Result<(), ParameterErrorKind> {
        let missing = match reference {
            ParameterReference::Name(name) => (!self.contains(name)).then_some(*name),
            ParameterReference::Typed(name, type_info) => match self.values.get(*name) {
                Some(value) if (*value.as_any()).type_id() != type_info.id => {
                    return Err(ParameterErrorKind::IncorrectType {
                        name: (*name).to_owned(),
                        expected: type_info.name,
                    });
                }
                Some(_) => None,
                None => Some(*name),
            },
            ParameterReference::Template(template) => placeholders(template).into_iter().find(|name| !self.contains(name)),
        };
        match missing {
            Some(name) => Err(ParameterErrorKind::Unknown { name: name.to_owned() }),
            None => Ok(()),
        }
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        segments.push(Segment::Placeholder(&rest[start + 2..start + 2 + len]));
        rest = &rest[start + 2 + len + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    segments
}

pub(crate) fn placeholders(template: &str) -> Vec<&str> {
    segments(template)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect()
}

use alloc::{boxed::Box, fmt};
use core::fmt::{Display, Formatter};

use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum InstantiatorErrorKind<DepsErr, FactoryErr> {
    #[error(transparent)]
    Deps(DepsErr),
    #[error(transparent)]
    Factory(FactoryErr),
}

#[derive(thiserror::Error, Debug)]
pub enum DFSErrorKind {
    CyclicDependency { graph: (TypeInfo, Box<[TypeInfo]>) },
}

impl Display for DFSErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DFSErrorKind::CyclicDependency {
                graph: (type_info, type_infos),
            } => {
                write!(f, "Cyclic dependency detected: {type_info}")?;
                for type_info in type_infos {
                    write!(f, " -> {type_info}")?;
                }
            }
        }
        Ok(())
    }
}

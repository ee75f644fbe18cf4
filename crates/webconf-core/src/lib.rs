pub mod config;
pub mod error;
pub mod registry;
pub mod visitor;

pub use config::ServerConfig;
pub use error::{Result, WebConfError};
pub use registry::{Registry, Tunable};
pub use visitor::{
    visit_composite, visit_enum_as_int, visit_enumerated, EnumChoice, Enumerated, FieldPath,
    Visit, Visitor,
};

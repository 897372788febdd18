mod execute;
pub mod validator;

pub use execute::{
    import_data, ApplyStats, FatalImportError, ImportOutcome, RestoreError,
};
pub use validator::{validate, ValidationReport};

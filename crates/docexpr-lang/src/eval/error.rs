use smol_str::SmolStr;
use thiserror::Error;

type FunctionName = SmolStr;
type ArgType = Vec<SmolStr>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Expression `{0}` returns more than one value")]
    NotScalar(String),
    #[error("No root document to resolve field `{0}`")]
    NoRootDocument(SmolStr),
    #[error(r#"Invalid types for "{}", got {}"#, name, args.join(", "))]
    InvalidTypes { name: FunctionName, args: ArgType },
    #[error("Divided by 0")]
    ZeroDivision,
    #[error("Index `{0}` must be a number")]
    IndexNotNumber(String),
    #[error(r#"Invalid argument for "{name}": {message}"#)]
    InvalidArgument { name: FunctionName, message: String },
    #[error("{0} is not supported by this backend")]
    Unsupported(SmolStr),
    #[error("Invalid JSON: {0}")]
    JsonError(String),
}

impl EvalError {
    pub(crate) fn invalid_types(name: &str, args: &[crate::value::Value]) -> Self {
        EvalError::InvalidTypes {
            name: name.into(),
            args: args.iter().map(|arg| arg.type_name().into()).collect(),
        }
    }

    pub(crate) fn invalid_argument(name: &str, message: impl Into<String>) -> Self {
        EvalError::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::JsonError(err.to_string())
    }
}

//! Prepare-call shape decoding.
//!
//! A prepare call is statement text, the callable flag, and a tail of
//! zero to three extra arguments. Call sites that know their overload build a
//! [`CallShape`] directly; drivers that only see the raw argument list go
//! through [`CallShape::decode`].

use crate::error::{KeyError, KeyResult};
use crate::types::{
    AutoGeneratedKeys, Holdability, PrepareMethod, ResultSetConcurrency, ResultSetType,
};

/// One trailing argument of a prepare call, tagged with its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum PrepareArg {
    Int(i32),
    IntArray(Vec<i32>),
    StringArray(Vec<String>),
    Long(i64),
    Bool(bool),
    Text(String),
    Null,
}

impl PrepareArg {
    /// Declared type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::IntArray(_) => "int[]",
            Self::StringArray(_) => "String[]",
            Self::Long(_) => "long",
            Self::Bool(_) => "boolean",
            Self::Text(_) => "String",
            Self::Null => "null",
        }
    }
}

impl From<i32> for PrepareArg {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<i32>> for PrepareArg {
    fn from(v: Vec<i32>) -> Self {
        Self::IntArray(v)
    }
}

impl From<Vec<String>> for PrepareArg {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

/// The recognized prepare overloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape<'a> {
    /// `prepare(sql)`
    Plain,
    /// `prepare(sql, int[] columnIndexes)`
    ColumnIndexes(&'a [i32]),
    /// `prepare(sql, String[] columnNames)`
    ColumnNames(&'a [String]),
    /// `prepare(sql, int autoGeneratedKeys)`
    AutoGeneratedKeys(AutoGeneratedKeys),
    /// `prepare(sql, int type, int concurrency)`
    ResultSet {
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
    },
    /// `prepare(sql, int type, int concurrency, int holdability)`
    Holdable {
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
        holdability: Holdability,
    },
}

impl<'a> CallShape<'a> {
    /// Decode a raw trailing-argument list.
    ///
    /// Shape is chosen by argument count, then by the declared type of the
    /// single argument in the one-argument case.
    pub fn decode(method: PrepareMethod, args: &'a [PrepareArg]) -> KeyResult<Self> {
        match args {
            [] => Ok(Self::Plain),
            [PrepareArg::IntArray(indexes)] => Ok(Self::ColumnIndexes(indexes)),
            [PrepareArg::StringArray(names)] => Ok(Self::ColumnNames(names)),
            [PrepareArg::Int(mode)] => Ok(Self::AutoGeneratedKeys(AutoGeneratedKeys::from_code(
                *mode,
            )?)),
            [other] => Err(KeyError::unsupported(
                method.name(),
                format!(
                    "single trailing argument must be int, int[] or String[], got {}",
                    other.type_name()
                ),
            )),
            [kind, concurrency] => {
                let kind = int_arg(method, kind, 1)?;
                let concurrency = int_arg(method, concurrency, 2)?;
                Ok(Self::ResultSet {
                    kind: ResultSetType::from_code(kind)?,
                    concurrency: ResultSetConcurrency::from_code(concurrency)?,
                })
            }
            [kind, concurrency, holdability] => {
                let kind = int_arg(method, kind, 1)?;
                let concurrency = int_arg(method, concurrency, 2)?;
                let holdability = int_arg(method, holdability, 3)?;
                Ok(Self::Holdable {
                    kind: ResultSetType::from_code(kind)?,
                    concurrency: ResultSetConcurrency::from_code(concurrency)?,
                    holdability: Holdability::from_code(holdability)?,
                })
            }
            _ => Err(KeyError::unsupported(
                method.name(),
                format!("unexpected number of trailing arguments: {}", args.len()),
            )),
        }
    }

    pub fn result_set_type(&self) -> ResultSetType {
        match *self {
            Self::ResultSet { kind, .. } | Self::Holdable { kind, .. } => kind,
            _ => ResultSetType::ForwardOnly,
        }
    }

    pub fn result_set_concurrency(&self) -> ResultSetConcurrency {
        match *self {
            Self::ResultSet { concurrency, .. } | Self::Holdable { concurrency, .. } => concurrency,
            _ => ResultSetConcurrency::ReadOnly,
        }
    }

    pub fn column_indexes(&self) -> Option<&'a [i32]> {
        match *self {
            Self::ColumnIndexes(indexes) => Some(indexes),
            _ => None,
        }
    }

    pub fn column_names(&self) -> Option<&'a [String]> {
        match *self {
            Self::ColumnNames(names) => Some(names),
            _ => None,
        }
    }

    pub fn autogenerated_keys(&self) -> Option<AutoGeneratedKeys> {
        match *self {
            Self::AutoGeneratedKeys(mode) => Some(mode),
            _ => None,
        }
    }

    pub fn holdability(&self) -> Option<Holdability> {
        match *self {
            Self::Holdable { holdability, .. } => Some(holdability),
            _ => None,
        }
    }
}

fn int_arg(method: PrepareMethod, arg: &PrepareArg, position: usize) -> KeyResult<i32> {
    match arg {
        PrepareArg::Int(v) => Ok(*v),
        other => Err(KeyError::unsupported(
            method.name(),
            format!(
                "trailing argument {} must be int, got {}",
                position,
                other.type_name()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const M: PrepareMethod = PrepareMethod::PrepareStatement;

    #[test]
    fn test_no_args_defaults() {
        let shape = CallShape::decode(M, &[]).unwrap();
        assert_eq!(shape, CallShape::Plain);
        assert_eq!(shape.result_set_type(), ResultSetType::ForwardOnly);
        assert_eq!(shape.result_set_concurrency(), ResultSetConcurrency::ReadOnly);
        assert_eq!(shape.column_indexes(), None);
        assert_eq!(shape.column_names(), None);
        assert_eq!(shape.autogenerated_keys(), None);
        assert_eq!(shape.holdability(), None);
    }

    #[test]
    fn test_single_arg_overloads() {
        let args = [PrepareArg::IntArray(vec![1, 2])];
        let shape = CallShape::decode(M, &args).unwrap();
        assert_eq!(shape.column_indexes(), Some(&[1, 2][..]));
        assert_eq!(shape.column_names(), None);

        let args = [PrepareArg::StringArray(vec!["id".into()])];
        let shape = CallShape::decode(M, &args).unwrap();
        assert_eq!(shape.column_names(), Some(&["id".to_string()][..]));
        assert_eq!(shape.column_indexes(), None);

        let args = [PrepareArg::Int(AutoGeneratedKeys::RETURN_GENERATED_KEYS)];
        let shape = CallShape::decode(M, &args).unwrap();
        assert_eq!(shape.autogenerated_keys(), Some(AutoGeneratedKeys::Return));
        assert_eq!(shape.result_set_type(), ResultSetType::ForwardOnly);
    }

    #[test]
    fn test_result_set_overloads() {
        let args = [
            PrepareArg::Int(ResultSetType::SCROLL_INSENSITIVE),
            PrepareArg::Int(ResultSetConcurrency::UPDATABLE),
        ];
        let shape = CallShape::decode(M, &args).unwrap();
        assert_eq!(
            shape,
            CallShape::ResultSet {
                kind: ResultSetType::ScrollInsensitive,
                concurrency: ResultSetConcurrency::Updatable,
            }
        );
        assert_eq!(shape.holdability(), None);

        let args = [
            PrepareArg::Int(ResultSetType::SCROLL_SENSITIVE),
            PrepareArg::Int(ResultSetConcurrency::READ_ONLY),
            PrepareArg::Int(Holdability::HOLD_CURSORS_OVER_COMMIT),
        ];
        let shape = CallShape::decode(M, &args).unwrap();
        assert_eq!(shape.holdability(), Some(Holdability::HoldCursors));
        assert_eq!(shape.result_set_type(), ResultSetType::ScrollSensitive);
    }

    #[test]
    fn test_unsupported_shapes() {
        let err = CallShape::decode(M, &[PrepareArg::Bool(true)]).unwrap_err();
        assert!(matches!(err, KeyError::UnsupportedCallShape { .. }));

        let args = vec![PrepareArg::Int(1003); 5];
        let err = CallShape::decode(PrepareMethod::PrepareCall, &args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported call shape for prepareCall: unexpected number of trailing arguments: 5"
        );

        let args = [PrepareArg::Int(1003), PrepareArg::Text("x".into())];
        let err = CallShape::decode(M, &args).unwrap_err();
        assert!(matches!(err, KeyError::UnsupportedCallShape { .. }));
    }

    #[test]
    fn test_invalid_constants() {
        let args = [PrepareArg::Int(7), PrepareArg::Int(1007)];
        let err = CallShape::decode(M, &args).unwrap_err();
        assert!(matches!(
            err,
            KeyError::InvalidConstant {
                field: "result set type",
                value: 7
            }
        ));

        let err = CallShape::decode(M, &[PrepareArg::Int(99)]).unwrap_err();
        assert!(err.is_shape_error());
    }
}

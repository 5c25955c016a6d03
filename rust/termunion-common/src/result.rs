pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns an `InvalidArgument` error from the enclosing function when the
/// condition does not hold. The error names the argument and the failed condition.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Returns an `InvalidOperation` error from the enclosing function when the
/// receiver is not in a state that permits the named operation.
#[macro_export]
macro_rules! verify_state {
    ($operation:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_state(result, $operation)?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_state(predicate: bool, operation: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_operation(operation)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn invalid_operation(operation: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidOperation {
        name: operation.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_len(values: &[u8]) -> super::Result<usize> {
        verify_arg!(values, !values.is_empty());
        Ok(values.len())
    }

    fn check_positioned(positioned: bool) -> super::Result<()> {
        verify_state!("next", positioned);
        Ok(())
    }

    #[test]
    fn test_verify_arg() {
        assert_eq!(check_len(b"ab").unwrap(), 2);
        let err = check_len(b"").unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "values");
                assert_eq!(message, "!values.is_empty()");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_verify_state() {
        assert!(check_positioned(true).is_ok());
        let err = check_positioned(false).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidOperation { name } if name == "next"
        ));
    }
}

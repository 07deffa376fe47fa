use dirconsole_common::ConsoleError;

/// Builder for the `list log` command line.
///
/// `limit` is required; `offset` and `reverse` are appended only when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    limit: Option<u32>,
    offset: Option<u32>,
    reverse: bool,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn command_line(&self) -> Result<String, ConsoleError> {
        let limit = self.limit.ok_or(ConsoleError::MissingArgument("limit"))?;

        let mut tokens = vec!["list".to_string(), "log".to_string(), format!("limit={}", limit)];
        if let Some(offset) = self.offset {
            tokens.push(format!("offset={}", offset));
        }
        if self.reverse {
            tokens.push("reverse".to_string());
        }

        Ok(tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_only() {
        let query = LogQuery::new().limit(50);
        assert_eq!(query.command_line().unwrap(), "list log limit=50");
    }

    #[test]
    fn test_limit_reverse() {
        let query = LogQuery::new().limit(50).reverse(true);
        assert_eq!(query.command_line().unwrap(), "list log limit=50 reverse");
    }

    #[test]
    fn test_limit_offset() {
        let query = LogQuery::new().limit(50).offset(10).reverse(false);
        assert_eq!(query.command_line().unwrap(), "list log limit=50 offset=10");
    }

    #[test]
    fn test_limit_offset_reverse() {
        let query = LogQuery::new().reverse(true).offset(10).limit(50);
        assert_eq!(
            query.command_line().unwrap(),
            "list log limit=50 offset=10 reverse"
        );
    }

    #[test]
    fn test_missing_limit() {
        let err = LogQuery::new().offset(10).reverse(true).command_line().unwrap_err();
        assert!(matches!(err, ConsoleError::MissingArgument("limit")));
    }
}

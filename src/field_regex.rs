use crate::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) struct FieldRegex {
    backend: fancy_regex::Regex,
}

impl FieldRegex {
    pub(crate) fn new(pattern: &str) -> Result<Self> {
        let backend =
            fancy_regex::Regex::new(pattern).map_err(|err| Error::Pattern(err.to_string()))?;
        Ok(Self { backend })
    }

    pub(crate) fn is_match(&self, input: &str) -> Result<bool> {
        self.backend
            .is_match(input)
            .map_err(|err| Error::Pattern(err.to_string()))
    }

    pub(crate) fn captures_pair(&self, input: &str) -> Result<Option<(String, String)>> {
        let captures = self
            .backend
            .captures(input)
            .map_err(|err| Error::Pattern(err.to_string()))?;
        Ok(captures.and_then(|caps| {
            let first = caps.get(1)?.as_str().to_string();
            let second = caps.get(2)?.as_str().to_string();
            Some((first, second))
        }))
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StandardsError {
    #[error("IT grade {0} not in database (available: 5-11)")]
    UnknownGrade(u8),

    #[error("deviation letter '{0}' not in database")]
    UnknownDeviationLetter(String),

    #[error("malformed fit spec '{0}'")]
    MalformedSpec(String),

    #[error("bolt size '{0}' not in database")]
    UnknownBoltSize(String),

    #[error("machining process '{0}' not in database")]
    UnknownProcess(String),

    #[error("center distance grade '{0}' not available")]
    UnknownCenterDistanceGrade(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_grade_message_carries_grade() {
        let err = StandardsError::UnknownGrade(12);
        assert!(err.to_string().contains("12"));
    }
}

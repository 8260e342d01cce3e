use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("no placement candidates supplied for box {w:.2}x{h:.2}")]
    NoCandidates { w: f64, h: f64 },

    #[error(transparent)]
    Core(#[from] dg_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_candidates_message_carries_dimensions() {
        let err = LayoutError::NoCandidates { w: 12.0, h: 4.0 };
        assert!(err.to_string().contains("12.00"));
    }
}

//! Topology and state errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A topology breaks a structural rule (room containers, id uniqueness)
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A reported wire value maps to no known state
    #[error("Unknown {kind} value {value}")]
    UnknownState { kind: &'static str, value: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::UnknownState { kind: "occupancy", value: 9 }.to_string(),
            "Unknown occupancy value 9"
        );
        assert_eq!(
            Error::InvalidTopology("duplicate AREA integration id 1".into()).to_string(),
            "Invalid topology: duplicate AREA integration id 1"
        );
    }
}

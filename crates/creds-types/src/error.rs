use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredsError {
    #[error("Credential already exists")]
    CredAlreadyExists,

    #[error("Credential does not exist")]
    CredNotFound,

    #[error("Merkle tree depth {0} is not supported")]
    DepthUnsupported(usize),

    #[error("Credential id is not less than the snark scalar field")]
    IdExceedsFieldModulus,

    #[error("Caller is not the credential admin")]
    NotAdmin,

    #[error("Merkle proof does not match the current tree root")]
    StaleOrInvalidPath,

    #[error("Merkle tree root is expired")]
    RootExpired,

    #[error("Merkle tree root is not part of the credential")]
    RootUnknown,

    #[error("Nullifier hash has already been used for this credential")]
    NullifierReused,

    #[error("External nullifier does not match the credential id")]
    ExternalNullifierMismatch,

    #[error("Mirror root {mirror} does not match ledger root {ledger}")]
    RootMismatch { mirror: String, ledger: String },

    #[error("Invalid membership proof")]
    InvalidProof,

    #[error("Group is full ({0} leaves)")]
    CapacityExceeded(usize),

    #[error("Identity commitment is already a member")]
    DuplicateMember,

    #[error("Identity commitment is not a member")]
    MemberNotFound,

    #[error("Identity is not a member of the group")]
    IdentityNotInGroup,

    #[error("Invalid identity commitment: {0}")]
    InvalidCommitment(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by callers to decide what to do with a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any state mutation or expensive computation.
    Validation,
    /// Caller lacks the admin role for the credential.
    Authorization,
    /// Local view of the tree is behind the ledger; refresh and retry.
    Staleness,
    /// Nullifier already spent. Permanent for that proof.
    Replay,
    /// Proof or key material rejected. Permanent.
    Cryptographic,
    /// Transport, storage or configuration problems.
    Infrastructure,
}

impl CredsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CredsError::CredAlreadyExists
            | CredsError::CredNotFound
            | CredsError::DepthUnsupported(_)
            | CredsError::IdExceedsFieldModulus
            | CredsError::CapacityExceeded(_)
            | CredsError::DuplicateMember
            | CredsError::MemberNotFound
            | CredsError::IdentityNotInGroup
            | CredsError::InvalidCommitment(_)
            | CredsError::ExternalNullifierMismatch
            | CredsError::InvalidAddress(_) => ErrorKind::Validation,
            CredsError::NotAdmin => ErrorKind::Authorization,
            CredsError::StaleOrInvalidPath | CredsError::RootExpired | CredsError::RootUnknown => {
                ErrorKind::Staleness
            }
            CredsError::NullifierReused => ErrorKind::Replay,
            CredsError::InvalidProof | CredsError::Crypto(_) => ErrorKind::Cryptographic,
            CredsError::Wallet(_)
            | CredsError::Network(_)
            | CredsError::Contract(_)
            | CredsError::Serialization(_)
            | CredsError::Io(_)
            | CredsError::Config(_)
            | CredsError::RootMismatch { .. }
            | CredsError::Internal(_) => ErrorKind::Infrastructure,
        }
    }

    /// True when refreshing the local root or path and resubmitting can succeed.
    /// Nothing in this workspace retries automatically.
    pub fn is_retryable_after_refresh(&self) -> bool {
        self.kind() == ErrorKind::Staleness
    }

    /// Permanent rejection of a specific proof submission.
    pub fn is_permanent_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Replay | ErrorKind::Cryptographic)
    }
}

impl From<std::io::Error> for CredsError {
    fn from(e: std::io::Error) -> Self {
        CredsError::Io(e.to_string())
    }
}

pub type CredsResult<T> = Result<T, CredsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(CredsError::NotAdmin.kind(), ErrorKind::Authorization);
        assert_eq!(CredsError::NullifierReused.kind(), ErrorKind::Replay);
        assert_eq!(CredsError::InvalidProof.kind(), ErrorKind::Cryptographic);
        assert_eq!(CredsError::DuplicateMember.kind(), ErrorKind::Validation);
        assert_eq!(
            CredsError::ExternalNullifierMismatch.kind(),
            ErrorKind::Validation
        );
        let mismatch = CredsError::RootMismatch {
            mirror: "1".into(),
            ledger: "2".into(),
        };
        assert_eq!(mismatch.kind(), ErrorKind::Infrastructure);
        assert!(!mismatch.is_retryable_after_refresh());
        assert_eq!(
            CredsError::Network("timeout".into()).kind(),
            ErrorKind::Infrastructure
        );
    }

    #[test]
    fn test_only_staleness_is_retryable() {
        assert!(CredsError::RootExpired.is_retryable_after_refresh());
        assert!(CredsError::StaleOrInvalidPath.is_retryable_after_refresh());
        assert!(CredsError::RootUnknown.is_retryable_after_refresh());
        assert!(!CredsError::NullifierReused.is_retryable_after_refresh());
        assert!(!CredsError::InvalidProof.is_retryable_after_refresh());
        assert!(!CredsError::NotAdmin.is_retryable_after_refresh());
    }

    #[test]
    fn test_permanent_rejections() {
        assert!(CredsError::NullifierReused.is_permanent_rejection());
        assert!(CredsError::InvalidProof.is_permanent_rejection());
        assert!(!CredsError::RootExpired.is_permanent_rejection());
    }
}

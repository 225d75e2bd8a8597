use ethers::contract::abigen;

abigen!(
    Credential,
    r#"[
        function createCred(uint256 credId, uint256 merkleTreeDepth, uint256 zeroValue, address admin, string credURI) external
        function updateCredAdmin(uint256 credId, address newAdmin) external
        function addIdentity(uint256 credId, uint256 identityCommitment) external
        function addIdentities(uint256 credId, uint256[] identityCommitments) external
        function updateIdentity(uint256 credId, uint256 identityCommitment, uint256 newIdentityCommitment, uint256[] proofSiblings, uint8[] proofPathIndices) external
        function removeIdentity(uint256 credId, uint256 identityCommitment, uint256[] proofSiblings, uint8[] proofPathIndices) external
        function verifyProof(uint256 credId, uint256 merkleTreeRoot, bytes32 signal, uint256 nullifierHash, uint256 externalNullifier, uint256[8] proof) external
        function getMerkleTreeRoot(uint256 credId) external view returns (uint256)
        function getMerkleTreeDepth(uint256 credId) external view returns (uint256)
        function getNumberOfMerkleTreeLeaves(uint256 credId) external view returns (uint256)
        function creds(uint256 credId) external view returns (address admin, string credURI, uint256 merkleRootDuration)
        function verifiers(uint256 merkleTreeDepth) external view returns (address)
        event CredCreated(uint256 indexed credId, uint256 merkleTreeDepth, uint256 zeroValue)
        event credAdminUpdated(uint256 indexed credId, address indexed oldAdmin, address indexed newAdmin)
        event IdentityAdded(uint256 indexed credId, uint256 index, uint256 identityCommitment, uint256 merkleTreeRoot)
        event IdentityRemoved(uint256 indexed credId, uint256 index, uint256 identityCommitment, uint256 merkleTreeRoot)
        event IdentityUpdated(uint256 indexed credId, uint256 index, uint256 identityCommitment, uint256 newIdentityCommitment, uint256 merkleTreeRoot)
        event NullifierHashAdded(uint256 nullifierHash)
        event ProofVerified(uint256 indexed credId, uint256 merkleTreeRoot, uint256 externalNullifier, uint256 nullifierHash, bytes32 signal)
    ]"#
);

//! Instructions for the token, associated-token and metadata programs.
//!
//! Each takes a one-byte discriminator followed by borsh-encoded arguments.
//! System program instructions come from `solana_system_interface`.

use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;

use crate::address::{
    ASSOCIATED_TOKEN_PROGRAM_ID, METADATA_PROGRAM_ID, RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID,
    TOKEN_PROGRAM_ID, associated_token_address,
};

pub mod token {
    use borsh::BorshSerialize;

    use super::{AccountMeta, Instruction, Pubkey, RENT_SYSVAR_ID, TOKEN_PROGRAM_ID};

    /// Size of a mint account.
    pub const MINT_SIZE: u64 = 82;

    const INITIALIZE_MINT: u8 = 0;
    const MINT_TO: u8 = 7;

    #[derive(Debug, BorshSerialize)]
    struct InitializeMintArgs {
        decimals: u8,
        mint_authority: Pubkey,
        freeze_authority: Option<Pubkey>,
    }

    #[must_use]
    pub fn initialize_mint(
        mint: &Pubkey,
        decimals: u8,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
    ) -> Instruction {
        let args = InitializeMintArgs {
            decimals,
            mint_authority: *mint_authority,
            freeze_authority: freeze_authority.copied(),
        };
        Instruction::new_with_borsh(
            TOKEN_PROGRAM_ID,
            &(INITIALIZE_MINT, args),
            vec![
                AccountMeta::new(*mint, false),
                AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
            ],
        )
    }

    #[must_use]
    pub fn mint_to(
        mint: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Instruction {
        Instruction::new_with_borsh(
            TOKEN_PROGRAM_ID,
            &(MINT_TO, amount),
            vec![
                AccountMeta::new(*mint, false),
                AccountMeta::new(*destination, false),
                AccountMeta::new_readonly(*authority, true),
            ],
        )
    }
}

pub mod associated_token {
    use super::{
        ASSOCIATED_TOKEN_PROGRAM_ID, AccountMeta, Instruction, Pubkey, SYSTEM_PROGRAM_ID,
        TOKEN_PROGRAM_ID, associated_token_address,
    };

    /// Create `owner`'s holding account for `mint`, paid by `payer`.
    #[must_use]
    pub fn create(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            ASSOCIATED_TOKEN_PROGRAM_ID,
            &[],
            vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(associated_token_address(owner, mint), false),
                AccountMeta::new_readonly(*owner, false),
                AccountMeta::new_readonly(*mint, false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
                AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            ],
        )
    }
}

pub mod metadata {
    use borsh::BorshSerialize;

    use super::{
        AccountMeta, Instruction, METADATA_PROGRAM_ID, Pubkey, SYSTEM_PROGRAM_ID,
        TOKEN_PROGRAM_ID,
    };

    const CREATE_METADATA_ACCOUNT_V3: u8 = 33;
    const CREATE_MASTER_EDITION_V3: u8 = 17;

    /// On-chain name limit in bytes.
    pub const MAX_NAME_LEN: usize = 32;
    pub const MAX_SYMBOL_LEN: usize = 10;
    pub const MAX_URI_LEN: usize = 200;

    #[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
    pub struct Creator {
        pub address: Pubkey,
        pub verified: bool,
        pub share: u8,
    }

    #[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
    pub struct Collection {
        pub verified: bool,
        pub key: Pubkey,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
    pub enum UseMethod {
        Burn,
        Multiple,
        Single,
    }

    #[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
    pub struct Uses {
        pub use_method: UseMethod,
        pub remaining: u64,
        pub total: u64,
    }

    #[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
    pub struct DataV2 {
        pub name: String,
        pub symbol: String,
        pub uri: String,
        pub seller_fee_basis_points: u16,
        pub creators: Option<Vec<Creator>>,
        pub collection: Option<Collection>,
        pub uses: Option<Uses>,
    }

    #[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
    pub enum CollectionDetails {
        V1 { size: u64 },
    }

    #[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
    pub struct CreateMetadataAccountArgsV3 {
        pub data: DataV2,
        pub is_mutable: bool,
        pub collection_details: Option<CollectionDetails>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
    pub struct CreateMasterEditionArgs {
        /// `Some(0)` forbids prints.
        pub max_supply: Option<u64>,
    }

    /// Accounts for a metadata-account creation.
    #[derive(Debug, Clone, Copy)]
    pub struct MetadataAccounts {
        pub metadata: Pubkey,
        pub mint: Pubkey,
        pub mint_authority: Pubkey,
        pub payer: Pubkey,
        pub update_authority: Pubkey,
    }

    #[must_use]
    pub fn create_metadata_account_v3(
        accounts: &MetadataAccounts,
        args: CreateMetadataAccountArgsV3,
    ) -> Instruction {
        Instruction::new_with_borsh(
            METADATA_PROGRAM_ID,
            &(CREATE_METADATA_ACCOUNT_V3, args),
            vec![
                AccountMeta::new(accounts.metadata, false),
                AccountMeta::new_readonly(accounts.mint, false),
                AccountMeta::new_readonly(accounts.mint_authority, true),
                AccountMeta::new(accounts.payer, true),
                AccountMeta::new_readonly(accounts.update_authority, false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            ],
        )
    }

    /// Accounts for a master-edition creation.
    #[derive(Debug, Clone, Copy)]
    pub struct EditionAccounts {
        pub edition: Pubkey,
        pub mint: Pubkey,
        pub update_authority: Pubkey,
        pub mint_authority: Pubkey,
        pub payer: Pubkey,
        pub metadata: Pubkey,
    }

    #[must_use]
    pub fn create_master_edition_v3(
        accounts: &EditionAccounts,
        args: CreateMasterEditionArgs,
    ) -> Instruction {
        Instruction::new_with_borsh(
            METADATA_PROGRAM_ID,
            &(CREATE_MASTER_EDITION_V3, args),
            vec![
                AccountMeta::new(accounts.edition, false),
                AccountMeta::new(accounts.mint, false),
                AccountMeta::new_readonly(accounts.update_authority, true),
                AccountMeta::new_readonly(accounts.mint_authority, true),
                AccountMeta::new(accounts.payer, true),
                AccountMeta::new(accounts.metadata, false),
                AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            ],
        )
    }
}

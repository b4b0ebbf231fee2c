//! The commitment transaction: one atomic transaction that mints a unique
//! badge for a day and pays that day's fee to the treasury.
//!
//! Instruction order:
//!
//! 1. create the mint account (rent-exempt, owned by the token program)
//! 2. initialize the mint (0 decimals, payer as mint and freeze authority)
//! 3. create the payer's holding account for the mint
//! 4. mint exactly one unit into it
//! 5. create the metadata account
//! 6. create the master edition with max supply 0
//! 7. transfer the fee to the treasury

use std::sync::Arc;

use checkin_types::{Address, DayNumber, FeeSchedule, HabitName, Lamports};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use solana_system_interface::instruction as system;
use tracing::debug;

use crate::TransactionBuildError;
use crate::address::{
    TOKEN_PROGRAM_ID, associated_token_address, edition_address, metadata_address,
};
use crate::badge::{BadgeSettings, badge_name, on_chain_name};
use crate::instruction::metadata::{
    self, CreateMasterEditionArgs, CreateMetadataAccountArgsV3, Creator, DataV2,
    EditionAccounts, MAX_SYMBOL_LEN, MAX_URI_LEN, MetadataAccounts,
};
use crate::instruction::{associated_token, token};
use crate::ledger::{BlockhashContext, LedgerClient};
use crate::transaction::{self, Transaction};

/// A built, mint-signed commitment transaction waiting for the payer.
#[derive(Debug, Clone)]
pub struct CommitmentTransaction {
    pub transaction: Transaction,
    pub day: DayNumber,
    pub payer: Address,
    pub mint: Address,
    pub holding_account: Address,
    pub metadata: Address,
    pub edition: Address,
    pub fee: Lamports,
    pub metadata_uri: String,
    pub context: BlockhashContext,
}

impl CommitmentTransaction {
    /// Slot the blockhash was observed at; submission must not be evaluated
    /// against an older ledger state.
    #[must_use]
    pub const fn min_context_slot(&self) -> u64 {
        self.context.slot
    }
}

pub struct CommitmentBuilder {
    ledger: Arc<dyn LedgerClient>,
    fees: FeeSchedule,
    treasury: Address,
    badge: BadgeSettings,
}

impl std::fmt::Debug for CommitmentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitmentBuilder")
            .field("fees", &self.fees)
            .field("treasury", &self.treasury)
            .field("badge", &self.badge)
            .finish_non_exhaustive()
    }
}

impl CommitmentBuilder {
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        fees: FeeSchedule,
        treasury: Address,
        badge: BadgeSettings,
    ) -> Self {
        Self {
            ledger,
            fees,
            treasury,
            badge,
        }
    }

    #[must_use]
    pub const fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    #[must_use]
    pub const fn treasury(&self) -> Address {
        self.treasury
    }

    #[must_use]
    pub const fn badge(&self) -> &BadgeSettings {
        &self.badge
    }

    /// Fetch a blockhash and the mint rent, generate a fresh mint key, and
    /// assemble the transaction. No side effects on failure.
    pub async fn build(
        &self,
        payer: Address,
        day: DayNumber,
        habit: &HabitName,
    ) -> Result<CommitmentTransaction, TransactionBuildError> {
        let context = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(TransactionBuildError::Blockhash)?;
        let rent = self
            .ledger
            .minimum_balance_for_rent_exemption(token::MINT_SIZE)
            .await
            .map_err(TransactionBuildError::Rent)?;
        let mint_key = SigningKey::generate(&mut OsRng);
        self.assemble(payer, day, habit, &mint_key, rent, context)
    }

    /// Pure assembly step of [`Self::build`].
    pub fn assemble(
        &self,
        payer: Address,
        day: DayNumber,
        habit: &HabitName,
        mint_key: &SigningKey,
        mint_rent: Lamports,
        context: BlockhashContext,
    ) -> Result<CommitmentTransaction, TransactionBuildError> {
        let metadata_uri = self.badge.metadata_uri(day);
        check_len("symbol", &self.badge.symbol, MAX_SYMBOL_LEN)?;
        check_len("uri", &metadata_uri, MAX_URI_LEN)?;

        let mint_pubkey = Pubkey::new_from_array(mint_key.verifying_key().to_bytes());
        let payer_pubkey = *payer.pubkey();
        let holding_account = associated_token_address(&payer_pubkey, &mint_pubkey);
        let metadata_account = metadata_address(&mint_pubkey);
        let edition = edition_address(&mint_pubkey);
        let fee = self.fees.fee(day);

        let args = CreateMetadataAccountArgsV3 {
            data: DataV2 {
                name: on_chain_name(&badge_name(day, habit)).to_string(),
                symbol: self.badge.symbol.clone(),
                uri: metadata_uri.clone(),
                seller_fee_basis_points: self.badge.royalty_basis_points,
                creators: Some(vec![Creator {
                    address: *self.treasury.pubkey(),
                    verified: false,
                    share: 100,
                }]),
                collection: None,
                uses: None,
            },
            is_mutable: true,
            collection_details: None,
        };

        let instructions: [Instruction; 7] = [
            system::create_account(
                &payer_pubkey,
                &mint_pubkey,
                mint_rent.get(),
                token::MINT_SIZE,
                &TOKEN_PROGRAM_ID,
            ),
            token::initialize_mint(&mint_pubkey, 0, &payer_pubkey, Some(&payer_pubkey)),
            associated_token::create(&payer_pubkey, &payer_pubkey, &mint_pubkey),
            token::mint_to(&mint_pubkey, &holding_account, &payer_pubkey, 1),
            metadata::create_metadata_account_v3(
                &MetadataAccounts {
                    metadata: metadata_account,
                    mint: mint_pubkey,
                    mint_authority: payer_pubkey,
                    payer: payer_pubkey,
                    update_authority: payer_pubkey,
                },
                args,
            ),
            metadata::create_master_edition_v3(
                &EditionAccounts {
                    edition,
                    mint: mint_pubkey,
                    update_authority: payer_pubkey,
                    mint_authority: payer_pubkey,
                    payer: payer_pubkey,
                    metadata: metadata_account,
                },
                CreateMasterEditionArgs {
                    max_supply: Some(0),
                },
            ),
            system::transfer(&payer_pubkey, self.treasury.pubkey(), fee.get()),
        ];

        let message = transaction::compile(&payer, &instructions, context.blockhash);
        let mut transaction = Transaction::new_unsigned(message);
        transaction.partial_sign(mint_key)?;
        let mint = Address::from(mint_pubkey);

        debug!(%day, %mint, %fee, blockhash = %context.blockhash, "Built commitment transaction");

        Ok(CommitmentTransaction {
            transaction,
            day,
            payer,
            mint,
            holding_account: Address::from(holding_account),
            metadata: Address::from(metadata_account),
            edition: Address::from(edition),
            fee,
            metadata_uri,
            context,
        })
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), TransactionBuildError> {
    if value.len() > max {
        return Err(TransactionBuildError::MetadataField {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{METADATA_PROGRAM_ID, SYSTEM_PROGRAM_ID};
    use crate::memory::MemoryLedger;
    use crate::transaction::Blockhash;

    fn treasury() -> Address {
        "9ny4NhFAkJWEwU1VSggsz1fbiwEn3o7GEXZ8NvdcDQhh".parse().unwrap()
    }

    fn builder() -> CommitmentBuilder {
        CommitmentBuilder::new(
            Arc::new(MemoryLedger::new()),
            FeeSchedule::default(),
            treasury(),
            BadgeSettings::default(),
        )
    }

    fn context() -> BlockhashContext {
        BlockhashContext {
            blockhash: Blockhash::new_from_array([8; 32]),
            last_valid_block_height: 1_000,
            slot: 900,
        }
    }

    fn assemble(day: u8) -> (SigningKey, CommitmentTransaction) {
        let payer = SigningKey::from_bytes(&[1; 32]);
        let mint = SigningKey::from_bytes(&[2; 32]);
        let built = builder()
            .assemble(
                Address::new(payer.verifying_key().to_bytes()),
                DayNumber::new(day).unwrap(),
                &HabitName::new("Read").unwrap(),
                &mint,
                Lamports::new(1_461_600),
                context(),
            )
            .unwrap();
        (payer, built)
    }

    fn program_of(tx: &Transaction, ix: usize) -> Pubkey {
        let msg = tx.message();
        msg.account_keys[usize::from(msg.instructions[ix].program_id_index)]
    }

    #[test]
    fn day_twelve_ends_with_max_fee_transfer_to_treasury() {
        let (_, built) = assemble(12);
        let msg = built.transaction.message();
        assert_eq!(msg.instructions.len(), 7);

        let last = msg.instructions.last().unwrap();
        assert_eq!(program_of(&built.transaction, 6), SYSTEM_PROGRAM_ID);
        assert_eq!(&last.data[..4], &2u32.to_le_bytes());
        assert_eq!(&last.data[4..], &80_000_000u64.to_le_bytes());
        assert_eq!(
            msg.account_keys[usize::from(last.accounts[1])],
            *treasury().pubkey()
        );
        assert_eq!(built.fee, FeeSchedule::default().fee(DayNumber::LAST));
    }

    #[test]
    fn derived_accounts_follow_from_mint() {
        let (payer, built) = assemble(1);
        let payer = Address::new(payer.verifying_key().to_bytes());
        let mint = *built.mint.pubkey();
        assert_eq!(*built.metadata.pubkey(), metadata_address(&mint));
        assert_eq!(*built.edition.pubkey(), edition_address(&mint));
        assert_eq!(
            *built.holding_account.pubkey(),
            associated_token_address(payer.pubkey(), &mint)
        );
        assert_eq!(program_of(&built.transaction, 4), METADATA_PROGRAM_ID);
        assert_eq!(program_of(&built.transaction, 5), METADATA_PROGRAM_ID);
    }

    #[test]
    fn payer_first_and_mint_signed() {
        let (payer, built) = assemble(1);
        let payer = Address::new(payer.verifying_key().to_bytes());
        let tx = &built.transaction;
        assert_eq!(tx.message().account_keys[0], *payer.pubkey());
        assert_eq!(tx.signer_keys(), &[*payer.pubkey(), *built.mint.pubkey()]);
        assert!(tx.signature_of(&built.mint).is_some());
        assert!(tx.signature_of(&payer).is_none());
        assert!(tx.verify_filled_signatures());
        assert_eq!(built.min_context_slot(), 900);
        assert_eq!(tx.message().recent_blockhash, context().blockhash);
    }

    #[test]
    fn metadata_instruction_carries_badge_name_and_uri() {
        let (_, built) = assemble(3);
        let data = &built.transaction.message().instructions[4].data;
        let name = b"Day 3: Read";
        assert_eq!(data[0], 33);
        assert_eq!(&data[1..5], &(name.len() as u32).to_le_bytes());
        assert_eq!(&data[5..5 + name.len()], name);
        assert!(built.metadata_uri.ends_with("/day3.json"));
    }

    #[test]
    fn overlong_symbol_is_rejected() {
        let builder = CommitmentBuilder::new(
            Arc::new(MemoryLedger::new()),
            FeeSchedule::default(),
            treasury(),
            BadgeSettings {
                symbol: "WAY-TOO-LONG".into(),
                ..BadgeSettings::default()
            },
        );
        let err = builder
            .assemble(
                Address::new([1; 32]),
                DayNumber::FIRST,
                &HabitName::new("Read").unwrap(),
                &SigningKey::from_bytes(&[2; 32]),
                Lamports::new(1),
                context(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionBuildError::MetadataField { field: "symbol", .. }
        ));
    }

    #[tokio::test]
    async fn build_surfaces_blockhash_failure() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.fail_blockhash(Some(crate::LedgerError::Transport("offline".into())));
        let builder = CommitmentBuilder::new(
            ledger.clone(),
            FeeSchedule::default(),
            treasury(),
            BadgeSettings::default(),
        );
        let err = builder
            .build(
                Address::new([1; 32]),
                DayNumber::FIRST,
                &HabitName::new("Read").unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransactionBuildError::Blockhash(_)));
        assert!(ledger.submitted().is_empty());
    }

    #[tokio::test]
    async fn build_uses_fresh_mint_each_time() {
        let builder = builder();
        let habit = HabitName::new("Read").unwrap();
        let a = builder
            .build(Address::new([1; 32]), DayNumber::FIRST, &habit)
            .await
            .unwrap();
        let b = builder
            .build(Address::new([1; 32]), DayNumber::FIRST, &habit)
            .await
            .unwrap();
        assert_ne!(a.mint, b.mint);
    }
}

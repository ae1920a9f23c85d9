use pitchfund_core::{BankAccount, NewBankAccount, Repository, SettlementError, SettlementResult};
use rust_decimal::Decimal;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::locks::KeyedLocks;

/// Moves money into and out of wallet (`dashboard_balance`) and linked bank
/// balances. Debits never take a balance below zero.
pub struct BalanceLedger {
    repo: Repository,
    locks: KeyedLocks,
}

impl BalanceLedger {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            locks: KeyedLocks::new(),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub async fn wallet_balance(&self, user_id: Uuid) -> SettlementResult<Decimal> {
        let profile = self
            .repo
            .profile(user_id)
            .await?
            .ok_or(SettlementError::NotFound("profile"))?;
        Ok(profile.wallet_balance())
    }

    /// Apply a signed delta to the user's wallet and return the new balance.
    ///
    /// A debit that would leave the wallet negative fails with
    /// [`SettlementError::InsufficientFunds`] and writes nothing.
    pub async fn adjust_wallet_balance(&self, user_id: Uuid, delta: Decimal) -> SettlementResult<Decimal> {
        let _guard = self.locks.lock(format!("profile:{user_id}")).await;

        let current = self.wallet_balance(user_id).await?;
        let new_balance = apply_delta(current, delta)?;
        self.repo.set_wallet_balance(user_id, new_balance).await?;

        debug!(%user_id, %delta, %new_balance, "wallet balance adjusted");
        Ok(new_balance)
    }

    /// Same contract as [`Self::adjust_wallet_balance`] against a bank account.
    pub async fn adjust_bank_balance(&self, bank_id: i64, delta: Decimal) -> SettlementResult<Decimal> {
        let _guard = self.locks.lock(format!("bank:{bank_id}")).await;

        let account = self
            .repo
            .bank_account(bank_id)
            .await?
            .ok_or(SettlementError::NotFound("bank account"))?;
        let new_balance = apply_delta(account.balance, delta)?;
        self.repo.set_bank_balance(bank_id, new_balance).await?;

        debug!(bank_id, %delta, %new_balance, "bank balance adjusted");
        Ok(new_balance)
    }

    /// Move `amount` from the user's linked bank account into their wallet.
    pub async fn top_up_from_bank(&self, user_id: Uuid, amount: Decimal) -> SettlementResult<Decimal> {
        require_positive(amount)?;
        let account = self
            .repo
            .bank_account_for(user_id)
            .await?
            .ok_or(SettlementError::NotFound("bank account"))?;

        self.adjust_bank_balance(account.id, -amount).await?;
        match self.adjust_wallet_balance(user_id, amount).await {
            Ok(balance) => {
                info!(%user_id, bank_id = account.id, %amount, "wallet topped up from bank");
                Ok(balance)
            }
            Err(err) => {
                if let Err(compensation) = self.adjust_bank_balance(account.id, amount).await {
                    error!(
                        %user_id,
                        bank_id = account.id,
                        %amount,
                        "failed to return funds to bank after wallet credit failed: {compensation}"
                    );
                }
                Err(err)
            }
        }
    }

    /// Move `amount` from the user's wallet back to their linked bank account.
    pub async fn withdraw_to_bank(&self, user_id: Uuid, amount: Decimal) -> SettlementResult<Decimal> {
        require_positive(amount)?;
        let account = self
            .repo
            .bank_account_for(user_id)
            .await?
            .ok_or(SettlementError::NotFound("bank account"))?;

        let balance = self.adjust_wallet_balance(user_id, -amount).await?;
        if let Err(err) = self.adjust_bank_balance(account.id, amount).await {
            if let Err(compensation) = self.adjust_wallet_balance(user_id, amount).await {
                error!(
                    %user_id,
                    bank_id = account.id,
                    %amount,
                    "failed to return funds to wallet after bank credit failed: {compensation}"
                );
            }
            return Err(err);
        }

        info!(%user_id, bank_id = account.id, %amount, "wallet withdrawn to bank");
        Ok(balance)
    }

    pub async fn bank_account_for(&self, user_id: Uuid) -> SettlementResult<BankAccount> {
        self.repo
            .bank_account_for(user_id)
            .await?
            .ok_or(SettlementError::NotFound("bank account"))
    }

    pub async fn link_bank_account(&self, account: NewBankAccount) -> SettlementResult<BankAccount> {
        for (field, value) in [
            ("account_holder_name", &account.account_holder_name),
            ("sort_code", &account.sort_code),
            ("account_number", &account.account_number),
        ] {
            if value.trim().is_empty() {
                return Err(SettlementError::validation(format!("{field} is required")));
            }
        }
        if account.balance < Decimal::ZERO {
            return Err(SettlementError::validation("balance must not be negative"));
        }

        let account = self.repo.create_bank_account(&account).await?;
        info!(user_id = %account.owner_id, bank_id = account.id, "bank account linked");
        Ok(account)
    }

    /// Overwrite the balance of the user's linked account.
    pub async fn set_bank_balance(&self, user_id: Uuid, balance: Decimal) -> SettlementResult<Decimal> {
        if balance < Decimal::ZERO {
            return Err(SettlementError::validation("balance must not be negative"));
        }
        let account = self.bank_account_for(user_id).await?;

        let _guard = self.locks.lock(format!("bank:{}", account.id)).await;
        self.repo.set_bank_balance(account.id, balance).await?;
        Ok(balance)
    }

    pub async fn unlink_bank_account(&self, user_id: Uuid) -> SettlementResult<()> {
        let account = self.bank_account_for(user_id).await?;

        let _guard = self.locks.lock(format!("bank:{}", account.id)).await;
        self.repo.delete_bank_account(account.id).await?;
        info!(%user_id, bank_id = account.id, "bank account unlinked");
        Ok(())
    }
}

fn apply_delta(current: Decimal, delta: Decimal) -> SettlementResult<Decimal> {
    let next = current
        .checked_add(delta)
        .ok_or_else(|| SettlementError::validation("balance would overflow"))?;
    if delta < Decimal::ZERO && next < Decimal::ZERO {
        return Err(SettlementError::InsufficientFunds);
    }
    Ok(next)
}

fn require_positive(amount: Decimal) -> SettlementResult<()> {
    if amount <= Decimal::ZERO {
        return Err(SettlementError::validation("amount must be positive"));
    }
    Ok(())
}

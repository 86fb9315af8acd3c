use alloy::network::ReceiptResponse as _;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{PendingTransactionBuilder, Provider};
use alloy::sol;
use alloy::transports::Transport;
use anyhow::Context as _;
use tracing::{debug, info};

use crate::provider::{EntryReceipt, RaffleContract, RpcProvider};

sol! {
    /// The client-facing subset of the raffle contract ABI.
    #[sol(rpc)]
    interface Raffle {
        function getEntranceFee() external view returns (uint256);
        function getNumberOfPlayers() external view returns (uint256);
        function getRecentWinner() external view returns (address);
        function enterRaffle() external payable;
    }
}

impl<ProviderT, TransportT> RaffleContract for RpcProvider<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    async fn entrance_fee(&self, raffle: Address) -> anyhow::Result<U256> {
        let provider = self.get_provider().await?;
        let raffle: Raffle::RaffleInstance<TransportT, &ProviderT> =
            Raffle::new(raffle, &*provider);
        let Raffle::getEntranceFeeReturn { _0: fee } = raffle
            .getEntranceFee()
            .call()
            .await
            .context("getEntranceFee call failed")?;
        Ok(fee)
    }

    async fn number_of_players(&self, raffle: Address) -> anyhow::Result<U256> {
        let provider = self.get_provider().await?;
        let raffle: Raffle::RaffleInstance<TransportT, &ProviderT> =
            Raffle::new(raffle, &*provider);
        let Raffle::getNumberOfPlayersReturn { _0: players } = raffle
            .getNumberOfPlayers()
            .call()
            .await
            .context("getNumberOfPlayers call failed")?;
        Ok(players)
    }

    async fn recent_winner(&self, raffle: Address) -> anyhow::Result<Address> {
        let provider = self.get_provider().await?;
        let raffle: Raffle::RaffleInstance<TransportT, &ProviderT> =
            Raffle::new(raffle, &*provider);
        let Raffle::getRecentWinnerReturn { _0: winner } = raffle
            .getRecentWinner()
            .call()
            .await
            .context("getRecentWinner call failed")?;
        Ok(winner)
    }

    async fn enter_raffle(
        &self,
        raffle: Address,
        from: Address,
        value: U256,
    ) -> anyhow::Result<TxHash> {
        let provider = self.get_provider().await?;
        let raffle: Raffle::RaffleInstance<TransportT, &ProviderT> =
            Raffle::new(raffle, &*provider);
        let call = raffle.enterRaffle().from(from).value(value);
        let pending = call.send().await.context("enterRaffle was not accepted")?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, %from, %value, "enterRaffle accepted by the provider");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> anyhow::Result<EntryReceipt> {
        let provider = self.get_provider().await?;
        info!("Mining in progress for {tx_hash}");
        let receipt = PendingTransactionBuilder::new(provider.root(), tx_hash)
            .with_required_confirmations(confirmations)
            .get_receipt()
            .await
            .with_context(|| format!("couldn't wait for transaction {tx_hash}"))?;

        let latest = provider
            .get_block_number()
            .await
            .context("couldn't retrieve the latest block number")?;
        let block_number = receipt.block_number;
        let confirmations = block_number
            .map(|mined| latest.saturating_sub(mined) + 1)
            .unwrap_or_default();
        info!("Txn completed with {confirmations} confirmations.");

        Ok(EntryReceipt {
            tx_hash: receipt.transaction_hash,
            block_number,
            confirmations,
            success: receipt.status(),
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use alloy::sol_types::{SolCall, SolValue};

    use super::*;
    use crate::provider::canned::Canned;

    const RAFFLE: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

    fn encoded(value: impl SolValue) -> String {
        format!("0x{}", alloy::hex::encode(value.abi_encode()))
    }

    #[tokio::test]
    async fn decodes_view_calls() {
        let winner = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
        let canned = Canned::new()
            .respond_call(
                Raffle::getEntranceFeeCall::SELECTOR,
                encoded(lottery_common::DEFAULT_ENTRANCE_FEE),
            )
            .respond_call(
                Raffle::getNumberOfPlayersCall::SELECTOR,
                encoded(U256::from(3)),
            )
            .respond_call(Raffle::getRecentWinnerCall::SELECTOR, encoded(winner));
        let provider = RpcProvider::new(canned.clone().into_provider());

        assert_eq!(
            provider.entrance_fee(RAFFLE).await.unwrap(),
            lottery_common::DEFAULT_ENTRANCE_FEE
        );
        assert_eq!(
            provider.number_of_players(RAFFLE).await.unwrap(),
            U256::from(3)
        );
        assert_eq!(provider.recent_winner(RAFFLE).await.unwrap(), winner);
        assert_eq!(canned.requests(), vec!["eth_call"; 3]);
    }

    #[tokio::test]
    async fn missing_contract_is_a_read_error() {
        // A call to an address without code returns empty data.
        let provider = RpcProvider::new(Canned::new().respond("eth_call", "0x").into_provider());
        let err = provider.entrance_fee(RAFFLE).await.unwrap_err();
        assert!(format!("{err:#}").contains("getEntranceFee"), "{err:#}");
    }

    #[tokio::test]
    async fn submission_returns_the_transaction_hash() {
        let tx_hash = TxHash::with_last_byte(0xab);
        let canned = Canned::new().respond("eth_sendTransaction", tx_hash);
        let provider = RpcProvider::new(canned.clone().into_provider());

        let submitted = provider
            .enter_raffle(RAFFLE, Address::with_last_byte(1), lottery_common::DEFAULT_ENTRANCE_FEE)
            .await
            .unwrap();
        assert_eq!(submitted, tx_hash);
        assert_eq!(canned.requests(), vec!["eth_sendTransaction"]);
    }

    #[tokio::test]
    async fn rejected_submission_is_an_error() {
        let provider = RpcProvider::new(Canned::new().into_provider());
        let err = provider
            .enter_raffle(RAFFLE, Address::with_last_byte(1), U256::from(1))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("not accepted"), "{err:#}");
    }
}

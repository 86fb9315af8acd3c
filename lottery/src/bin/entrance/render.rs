use lottery::connection::ConnectionState;
use lottery::fetcher::ViewState;
use lottery::notify::ViewRenderer;
use lottery_common::{network_name, wei_to_eth_string};
use tracing::warn;

/// Prints the raffle the way the web page lays it out.
pub(crate) struct TerminalRenderer;

impl ViewRenderer for TerminalRenderer {
    fn render(&self, view: &ViewState) {
        println!(
            "Entrance Fee is: {} ETH",
            wei_to_eth_string(view.entrance_fee)
        );
        println!("The current number of players is: {}", view.num_players);
        println!("The recent winner is: {}", view.recent_winner);
    }

    fn render_connection(&self, connection: &ConnectionState) {
        println!("{connection}");
    }

    fn render_no_contract(&self, chain_id: u64) {
        println!("No Raffle Address Detected on {}", network_name(chain_id));
    }

    fn render_busy(&self, busy: bool) {
        if busy {
            println!("Entering raffle...");
        }
    }
}

/// One JSON document per snapshot, for scripts.
pub(crate) struct JsonRenderer;

impl ViewRenderer for JsonRenderer {
    fn render(&self, view: &ViewState) {
        match serde_json::to_string(view) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!("couldn't serialize the raffle state: {e}"),
        }
    }
}

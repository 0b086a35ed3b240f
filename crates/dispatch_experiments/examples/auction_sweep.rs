//! Example: compare auction rules on the default city.
//!
//! Runs every auction type crossed with every payment rule for truthful and
//! shaded bidders, prints the rule with the highest coordinator payoff and
//! writes all results to CSV.

use dispatch_core::bidding::BiddingStrategyKind;
use dispatch_core::config::CityPreset;
use dispatch_experiments::{export_to_csv, run_parallel_experiments, ParameterSpace};

fn main() -> anyhow::Result<()> {
    println!("Starting auction sweep...");

    let parameter_sets = ParameterSpace::all_auction_rules()
        .bidding_strategy(vec![BiddingStrategyKind::Truthful, BiddingStrategyKind::Shaded])
        .runs(2)
        .generate();
    println!("Generated {} parameter sets", parameter_sets.len());

    let results = run_parallel_experiments(&CityPreset::default(), &parameter_sets, None)?;
    println!("Completed {} simulations", results.len());

    if let Some(best) = results
        .iter()
        .max_by(|a, b| a.coordinator_payoff.total_cmp(&b.coordinator_payoff))
    {
        println!("\n=== Highest Coordinator Payoff ===");
        println!("Auction: {} / {}", best.auction_type, best.payment_rule);
        println!("Bidding: {}", best.bidding_strategy);
        println!("Coordinator payoff: {:.2}", best.coordinator_payoff);
        println!("Vehicle payoff (total): {:.2}", best.vehicle_payoff_total);
        println!("Acceptance rate: {:.1}%", best.acceptance_rate * 100.0);
        println!("Avg waiting time: {:.1} min", best.avg_waiting_time * 60.0);
    }

    export_to_csv(&results, &parameter_sets, "auction_sweep.csv")?;
    println!("\nResults written to auction_sweep.csv");
    Ok(())
}

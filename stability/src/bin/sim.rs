//! Stability engine simulation CLI.
//!
//! Drive the oracle and treasury through many blocks with synthetic
//! validators and traffic, printing the resulting trajectories.

#[cfg(feature = "cli")]
mod cli {
    use anyhow::{anyhow, Context as _, Result};
    use bth_stability::{
        budget,
        config::Config,
        context::{Bank, Context},
        genesis::{init_genesis, GenesisState},
        handler::{self, Msg},
        mock::{acc, val, MockBank, MockStaking},
        oracle::{PriceRecord, VoteHash},
        query::Querier,
        telemetry, treasury, Coin, Dec, KvStore, LmdbStore, MemStore, ModuleAccount, Params,
    };
    use clap::{Parser, Subcommand};
    use rand::prelude::*;
    use std::path::PathBuf;
    use tracing::info;

    #[derive(Parser)]
    #[command(name = "stability-sim")]
    #[command(about = "Simulate the oracle and treasury control loop")]
    pub struct Cli {
        /// TOML config file with parameter overrides
        #[arg(short, long, global = true)]
        pub config: Option<PathBuf>,

        /// RNG seed
        #[arg(short, long, global = true, default_value = "42")]
        pub seed: u64,

        /// Enable debug logging
        #[arg(short, long, global = true)]
        pub verbose: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand)]
    pub enum Command {
        /// Noisy validators report a rate over many voting periods
        Oracle {
            /// Number of validators with equal power
            #[arg(short = 'n', long, default_value = "10")]
            validators: u8,

            /// Voting periods to simulate
            #[arg(short, long, default_value = "20")]
            periods: u64,

            /// True exchange rate validators observe
            #[arg(short, long, default_value = "8712")]
            rate: String,

            /// Report noise in basis points
            #[arg(long, default_value = "50")]
            noise_bps: i64,

            /// Chance in percent that a validator skips a period
            #[arg(long, default_value = "10")]
            absent_pct: u32,
        },

        /// Epochs of taxed volume and native contraction
        Treasury {
            /// Epochs to simulate
            #[arg(short, long, default_value = "30")]
            epochs: u64,

            /// Blocks per epoch (overrides config)
            #[arg(short, long, default_value = "10")]
            blocks_per_epoch: u64,

            /// Mean taxable volume per block in ukrw
            #[arg(long, default_value = "50000000")]
            volume: u64,

            /// Mean native units burned by swaps per block
            #[arg(long, default_value = "20000")]
            burn: u64,
        },
    }

    /// One in-process chain with in-memory collaborators.
    struct SimChain {
        store: Box<dyn KvStore>,
        staking: MockStaking,
        bank: MockBank,
        params: Params,
        height: u64,
    }

    impl SimChain {
        fn new(
            config: &Config,
            params: Params,
            validators: u8,
            bank: MockBank,
            genesis: GenesisState,
        ) -> Result<Self> {
            let store: Box<dyn KvStore> = match &config.storage.path {
                Some(path) => Box::new(
                    LmdbStore::open_with_map_size(path, config.storage.map_size_mb * 1024 * 1024)
                        .with_context(|| format!("Failed to open store at {}", path.display()))?,
                ),
                None => Box::new(MemStore::new()),
            };
            let mut chain = Self {
                store,
                staking: MockStaking::new((1..=validators).map(|i| (val(i), 100))),
                bank,
                params: params.clone(),
                height: 1,
            };
            let genesis = GenesisState { params, ..genesis };
            init_genesis(chain.store.as_mut(), &chain.bank, &genesis)?;
            Ok(chain)
        }

        fn ctx(&mut self) -> Context<'_> {
            Context::with_params(
                self.height,
                self.height * 6,
                self.store.as_mut(),
                &mut self.staking,
                &mut self.bank,
                self.params.clone(),
            )
        }

        fn deliver(&mut self, msg: Msg) -> Result<()> {
            handler::deliver(&mut self.ctx(), &msg).map_err(|e| anyhow!("{} rejected: {e}", msg.kind()))?;
            Ok(())
        }

        fn end_block(&mut self) -> Result<()> {
            handler::end_block(&mut self.ctx())?;
            self.height += 1;
            Ok(())
        }
    }

    pub fn run(cli: Cli) -> Result<()> {
        let config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        telemetry::init_tracing(&config.log, cli.verbose)?;
        let mut rng = StdRng::seed_from_u64(cli.seed);

        match cli.command {
            Command::Oracle {
                validators,
                periods,
                rate,
                noise_bps,
                absent_pct,
            } => {
                let rate: Dec = rate.parse().map_err(|e| anyhow!("bad --rate: {e}"))?;
                run_oracle(&config, &mut rng, validators, periods, rate, noise_bps, absent_pct)
            }
            Command::Treasury {
                epochs,
                blocks_per_epoch,
                volume,
                burn,
            } => run_treasury(&config, &mut rng, epochs, blocks_per_epoch, volume, burn),
        }
    }

    fn run_oracle(
        config: &Config,
        rng: &mut StdRng,
        validators: u8,
        periods: u64,
        rate: Dec,
        noise_bps: i64,
        absent_pct: u32,
    ) -> Result<()> {
        let params = config.params();
        let vote_period = params.oracle.vote_period;
        let native = params.clock.native_denom.clone();
        let mut bank = MockBank::default();
        bank.credit(&ModuleAccount::RewardPool.address(), &Coin::new(native.clone(), 1_000_000_000))?;
        let mut chain = SimChain::new(config, params, validators, bank, GenesisState::default())?;

        println!("Oracle Simulation");
        println!("=================");
        println!("Validators: {validators}, true rate: {rate}, noise: ±{noise_bps}bps\n");
        println!("{:>7} {:>28} {:>8} {:>12}", "Period", "Rate", "Active", "Pool");
        println!("{:-<7} {:-<28} {:-<8} {:-<12}", "", "", "", "");

        for _ in 0..periods {
            let period_start = chain.height;
            for i in 1..=validators {
                if rng.gen_range(0..100) < absent_pct {
                    continue;
                }
                let k = rng.gen_range(-noise_bps.abs()..=noise_bps.abs());
                let reported = Dec::from_int(10_000 + k)
                    .checked_quo(Dec::from_int(10_000))
                    .map(|f| rate * f)
                    .unwrap_or(rate);
                let salt = format!("{:08x}", rng.gen::<u32>());
                let hash = VoteHash::compute(&salt, reported, "foo", &val(i));
                chain.deliver(Msg::PricePrevote {
                    hash: hash.to_hex(),
                    denom: "foo".into(),
                    validator: val(i),
                })?;
                chain.deliver(Msg::PriceVote {
                    rate: reported,
                    salt,
                    denom: "foo".into(),
                    validator: val(i),
                })?;
            }

            let period_end = (period_start / vote_period + 1) * vote_period;
            while chain.height < period_end {
                chain.end_block()?;
            }

            let querier = Querier::new(chain.store.as_ref());
            let record: Option<PriceRecord> = querier.exchange_rate("foo")?;
            let pool = chain.bank.balance(&ModuleAccount::RewardPool.address(), &native);
            match record {
                Some(r) => println!("{:>7} {:>28} {:>8} {:>12}", r.period, r.rate, r.active, pool),
                None => println!("{:>7} {:>28} {:>8} {:>12}", "-", "-", false, pool),
            }
        }

        let querier = Querier::new(chain.store.as_ref());
        println!("\nMiss counters:");
        for i in 1..=validators {
            println!("  {}: {}", val(i), querier.miss_counter(&val(i))?);
        }
        if !chain.staking.miss_signals.is_empty() {
            println!("Miss signals: {:?}", chain.staking.miss_signals);
        }
        Ok(())
    }

    fn run_treasury(
        config: &Config,
        rng: &mut StdRng,
        epochs: u64,
        blocks_per_epoch: u64,
        volume: u64,
        burn: u64,
    ) -> Result<()> {
        let mut params = config.params();
        params.clock.blocks_per_epoch = blocks_per_epoch;
        params.budget.vote_period = blocks_per_epoch;
        params.validate()?;
        let native = params.clock.native_denom.clone();

        let genesis = GenesisState {
            prices: vec![PriceRecord {
                denom: "ukrw".into(),
                rate: Dec::from_int(1200),
                period: 0,
                active: true,
            }],
            ..Default::default()
        };
        // Native holder that swaps burn from; funded before the issuance snapshot.
        let holder = acc(200);
        let mut bank = MockBank::default();
        bank.credit(&holder, &Coin::new(native.clone(), 1_000_000_000_000))?;
        bank.credit(&acc(1), &params.budget.deposit)?;

        let mut chain = SimChain::new(config, params, 4, bank, genesis)?;

        // One approved program so the budget pool pays out.
        chain.deliver(Msg::SubmitProgram {
            title: "sim".into(),
            description: "simulated program".into(),
            submitter: acc(1),
            executor: acc(2),
        })?;
        for i in 1..=4 {
            chain.deliver(Msg::VoteProgram {
                program_id: budget::INITIAL_PROGRAM_ID,
                approve: true,
                voter: val(i),
            })?;
        }

        println!("Treasury Simulation");
        println!("===================");
        println!("Epochs: {epochs}, blocks/epoch: {blocks_per_epoch}\n");
        println!(
            "{:>6} {:>24} {:>24} {:>12} {:>12}",
            "Epoch", "Tax rate", "Reward weight", "Seigniorage", "Miner"
        );
        println!("{:-<6} {:-<24} {:-<24} {:-<12} {:-<12}", "", "", "", "", "");

        for epoch in 0..epochs {
            while chain.height < (epoch + 1) * blocks_per_epoch {
                let block_volume = rng.gen_range(volume / 2..=volume + volume / 2);
                let coin = Coin::new("ukrw", block_volume);
                let mut ctx = chain.ctx();
                let tax = treasury::tax_for(&ctx, &coin)?;
                treasury::record_tx_volume(&mut ctx, &[coin])?;
                treasury::record_tax_proceeds(&mut ctx, &[Coin::new("ukrw", tax)])?;
                drop(ctx);

                let burned = rng.gen_range(0..=burn * 2);
                chain.bank.debit(&holder, &Coin::new(native.clone(), burned))?;
                chain.end_block()?;
            }

            let querier = Querier::new(chain.store.as_ref());
            let state = querier.treasury_state()?;
            let indicators = querier.indicators(epoch)?.unwrap_or_default();
            println!(
                "{:>6} {:>24} {:>24} {:>12} {:>12}",
                epoch, state.tax_rate, state.reward_weight, indicators.seigniorage, indicators.miner_reward
            );
        }

        let executor_balance = chain.bank.balance(&acc(2), &native);
        info!(executor_balance, "Simulation finished");
        println!("\nProgram executor received {executor_balance}{native}");
        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    use clap::Parser;
    let cli = cli::Cli::parse();
    cli::run(cli)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with:");
    eprintln!("  cargo build -p bth-stability --features cli --bin stability-sim");
}

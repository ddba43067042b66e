use crate::config::ConfigLoader;
use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL_CONDENSED};
use funnel_core::variant::{
    DietaryPreference, Goal, TimeCommitment, UserSignals, VariantSelector, bucket_hash,
    variant_hash,
};

#[derive(Args)]
pub struct VariantArgs {
    #[command(subcommand)]
    pub command: VariantCommands,
}

#[derive(Subcommand)]
pub enum VariantCommands {
    /// Pick the paywall variant for a profile and quiz answers
    Select {
        #[command(flatten)]
        signals: SignalArgs,

        /// Print the variant's paywall content as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the 50/50 bucket for one or more ids
    Bucket {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Profile and quiz answers describing one user
#[derive(Args, Debug, Clone)]
pub struct SignalArgs {
    /// Goal, e.g. `lose-weight`
    #[arg(long)]
    pub goal: String,

    /// Dietary preference, e.g. `meal-prep`
    #[arg(long)]
    pub diet: Option<String>,

    /// Daily time commitment, e.g. `30min`
    #[arg(long)]
    pub time: Option<String>,

    /// Quiz answer as `question=answer`; repeatable
    #[arg(long = "answer", value_name = "QUESTION=ANSWER")]
    pub answers: Vec<String>,
}

impl SignalArgs {
    pub fn to_signals(&self) -> Result<UserSignals> {
        let mut signals = UserSignals::new(self.goal.parse::<Goal>()?);
        if let Some(diet) = &self.diet {
            signals = signals.with_dietary_preference(diet.parse::<DietaryPreference>()?);
        }
        if let Some(time) = &self.time {
            signals = signals.with_time_commitment(time.parse::<TimeCommitment>()?);
        }
        for (question, answer) in self.quiz_answers()? {
            signals = signals.with_answer(question, answer);
        }
        Ok(signals)
    }

    /// Quiz answers split into (question, answer) pairs
    pub fn quiz_answers(&self) -> Result<Vec<(&str, &str)>> {
        self.answers
            .iter()
            .map(|raw| match raw.split_once('=') {
                Some((question, answer)) if !question.trim().is_empty() => {
                    Ok((question.trim(), answer.trim()))
                }
                _ => bail!("quiz answer must look like QUESTION=ANSWER, got {:?}", raw),
            })
            .collect()
    }
}

pub fn run(args: VariantArgs) -> Result<()> {
    match args.command {
        VariantCommands::Select { signals, json } => select(&signals, json),
        VariantCommands::Bucket { ids } => {
            print_buckets(&ids);
            Ok(())
        }
    }
}

fn print_buckets(ids: &[String]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Hash").fg(Color::Cyan),
        Cell::new("Bucket").fg(Color::Cyan),
    ]);
    for id in ids {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(bucket_hash(id)),
            Cell::new(variant_hash(id)),
        ]);
    }
    println!("{table}");
}

fn select(args: &SignalArgs, json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let selector = VariantSelector::new(config.variant);
    let variant = selector.select(&args.to_signals()?);

    if json {
        println!("{}", serde_json::to_string_pretty(variant.content())?);
    } else {
        let content = variant.content();
        println!("Variant:  {}", variant);
        println!("Headline: {}", content.headline);
        println!("CTA:      {}", content.cta);
    }
    Ok(())
}

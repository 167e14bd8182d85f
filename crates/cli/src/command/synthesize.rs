use anyhow::Result;
use clap::Args;
use phc_protocol::{serialize_json_pretty, ErrorEnvelope};
use phc_synthesis::{synthesize, FRAGMENT_NAMES};

use crate::{exit_with_error, print_stdout};

#[derive(Args)]
pub struct SynthesizeArgs {
    /// Four JSON fragments, in order: piu dki uip pca
    #[arg(value_name = "FRAGMENT")]
    pub fragments: Vec<String>,
}

pub fn run(args: SynthesizeArgs) -> Result<()> {
    let [piu, dki, uip, pca]: [String; 4] = match args.fragments.try_into() {
        Ok(fragments) => fragments,
        Err(given) => {
            exit_with_error(
                &ErrorEnvelope::new(
                    "missing_arguments",
                    format!(
                        "synthesize expects 4 JSON arguments ({}), got {}",
                        FRAGMENT_NAMES.join(" "),
                        given.len()
                    ),
                )
                .with_hint("Usage: phc synthesize <piu> <dki> <uip> <pca>"),
            )
        }
    };

    match synthesize(piu, dki, uip, pca) {
        Ok(summary) => print_stdout(&serialize_json_pretty(&summary)?),
        Err(err) => exit_with_error(&ErrorEnvelope::new("invalid_json", err.to_string())),
    }
}

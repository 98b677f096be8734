#![warn(clippy::indexing_slicing)]
#![deny(unused_crate_dependencies)]

use std::{fs, io::Write, path::Path};

use clap::Parser;
use config::{Cli, CodesArgs, Commands, ConfigArgs, LayoutArgs, PnachArgs};
use error::{CliError, CliResult};
use serde::Serialize;
use tether_config::{LayerConfig, TargetVariant};
use tether_layer::{
    patch::{parse_patch_codes, pnach, DataPatch, PatchWidth},
    HandlerId, LayerSetup,
};
use tether_protocol::Address;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod error;

fn load_setup(args: &ConfigArgs) -> CliResult<LayerSetup> {
    let config = LayerConfig::resolve(args.config.as_deref())?;
    debug!(?config, "resolved layer config");

    Ok(LayerSetup::new(config)?)
}

fn pnach_command(args: &PnachArgs) -> CliResult<()> {
    let setup = load_setup(&args.config)?;
    let comment = format!("tether {}", setup.profile().variant);

    let rendered = pnach::render(
        &args.title,
        &comment,
        setup.table().writes(setup.trampolines()),
    );

    match &args.output {
        Some(path) => fs::write(path, rendered).map_err(|err| CliError::Write(path.clone(), err)),
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct TrampolineReport {
    handler: &'static str,
    address: Address,
}

/// Everything an external agent (or a memory dump reader) needs to find the session block.
#[derive(Debug, Serialize)]
struct LayoutReport {
    target: TargetVariant,
    command: Option<Address>,
    inbound: Address,
    outbound: Address,
    end: Address,
    trampolines: Vec<TrampolineReport>,
}

impl LayoutReport {
    fn new(setup: &LayerSetup) -> Self {
        let layout = setup.layout();
        let trampolines = HandlerId::ALL
            .into_iter()
            .map(|handler| TrampolineReport {
                handler: handler.name(),
                address: setup.trampolines().address_of(handler),
            })
            .collect();

        Self {
            target: setup.profile().variant,
            command: layout.command.map(|command| command.base()),
            inbound: layout.inbound.base(),
            outbound: layout.outbound.base(),
            end: layout.end(),
            trampolines,
        }
    }

    fn write_table<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "target      {}", self.target)?;
        match self.command {
            Some(command) => writeln!(out, "command     {command:#010x}")?,
            None => writeln!(out, "command     -")?,
        }
        writeln!(out, "inbound     {:#010x}", self.inbound)?;
        writeln!(out, "outbound    {:#010x}", self.outbound)?;
        writeln!(out, "end         {:#010x}", self.end)?;
        writeln!(out)?;

        for trampoline in &self.trampolines {
            writeln!(out, "{:<20}{:#010x}", trampoline.handler, trampoline.address)?;
        }
        Ok(())
    }
}

fn layout_command(args: &LayoutArgs) -> CliResult<()> {
    let setup = load_setup(&args.config)?;
    let report = LayoutReport::new(&setup);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    } else {
        report
            .write_table(std::io::stdout().lock())
            .map_err(|err| CliError::Write("stdout".into(), err))
    }
}

fn format_code(patch: &DataPatch) -> String {
    let digits = match patch.width {
        PatchWidth::Byte => 2,
        PatchWidth::Half => 4,
        PatchWidth::Word => 8,
    };

    format!(
        "{}, 0x{:08x}, 0x{:0digits$x}, 0x{:0digits$x}",
        patch.width.bits(),
        patch.address,
        patch.original.unwrap_or_default(),
        patch.value,
    )
}

fn read_codes(path: &Path) -> CliResult<Vec<DataPatch>> {
    let text = fs::read_to_string(path).map_err(|err| CliError::Read(path.to_path_buf(), err))?;

    parse_patch_codes(&text).map_err(|err| CliError::PatchCode(path.to_path_buf(), err))
}

fn codes_command(args: &CodesArgs) -> CliResult<()> {
    let codes = read_codes(&args.path)?;

    for code in &codes {
        println!("{}", format_code(code));
    }
    debug!(count = codes.len(), "parsed patch codes");

    Ok(())
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    match cli.commands {
        Commands::Pnach(args) => pnach_command(&args)?,
        Commands::Layout(args) => layout_command(&args)?,
        Commands::Codes(args) => codes_command(&args)?,
    }

    Ok(())
}

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use log::{error, info, warn, LevelFilter};

use lvseg::linker::{build_links, ContourKind, LinkOptions, Manifest};
use lvseg::pixels::ImageFileDecoder;
use lvseg::{table, Error, SampleLoader};

#[derive(Parser)]
#[command(
    name = "lvseg",
    version,
    about = "Link cardiac imaging files to contour annotations and rasterize boolean masks"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pair image files with contour files by numeric index and write
    /// the link table as CSV.
    Link {
        /// Root directory of per-subject image folders.
        #[arg(long)]
        image_root: PathBuf,

        /// Root directory of per-subject contour folders.
        #[arg(long)]
        contour_root: PathBuf,

        /// Two-column CSV (with header) pairing image folders with
        /// contour folders.
        #[arg(long)]
        manifest: PathBuf,

        /// Which annotation to link: "inner" or "outer".
        #[arg(long, value_parser = ContourKind::from_str)]
        kind: ContourKind,

        /// Output CSV path for the link table.
        #[arg(long)]
        out: PathBuf,

        /// Keep images that have no matching contour file (empty third
        /// column) instead of dropping them.
        #[arg(long)]
        keep_unmatched: bool,

        /// Also write the full link report (records plus skipped files)
        /// as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Rasterize the contours of a link table into 8-bit PNG masks.
    ExportMasks {
        /// Link table CSV produced by `lvseg link`.
        #[arg(long)]
        table: PathBuf,

        /// Directory to write `<subject>-<index>.png` masks into.
        #[arg(long)]
        out_dir: PathBuf,
    },
}

fn main() {
    setup_logger();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Link {
            image_root,
            contour_root,
            manifest,
            kind,
            out,
            keep_unmatched,
            report,
        } => {
            let manifest = Manifest::from_file(&manifest)?;
            info!("linking {} subjects ({} contours)", manifest.len(), kind);

            let link_report = build_links(
                &manifest,
                &image_root,
                &contour_root,
                kind,
                LinkOptions { keep_unmatched },
            )?;
            info!(
                "linked {} records, skipped {} files",
                link_report.records.len(),
                link_report.skipped.len()
            );

            table::write_records(&out, &link_report.records)?;
            if let Some(report_path) = report {
                fs::write(&report_path, serde_json::to_string_pretty(&link_report)?)?;
                info!("wrote link report to {}", report_path.display());
            }
            Ok(())
        }

        Command::ExportMasks { table, out_dir } => {
            let records = table::read_records(&table)?;
            fs::create_dir_all(&out_dir)?;

            let loader = SampleLoader::new(ImageFileDecoder);
            let mut written = 0usize;
            for record in &records {
                let index = match lvseg::linker::image_index(&record.image) {
                    Ok(index) => index,
                    Err(err) => {
                        warn!("skipping {}: {}", record.image.display(), err);
                        continue;
                    }
                };
                match loader.load(record) {
                    Ok(sample) => {
                        let path = out_dir.join(format!("{}-{index}.png", record.subject));
                        sample.mask.to_image().save(&path)?;
                        written += 1;
                    }
                    Err(err) => warn!("skipping {}: {}", record.image.display(), err),
                }
            }
            info!("wrote {} masks to {}", written, out_dir.display());
            Ok(())
        }
    }
}

fn setup_logger() {
    let mut builder = env_logger::Builder::new();
    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter(Some("lvseg"), LevelFilter::Info);
    }
    builder.format(|buf, record| writeln!(buf, "{:<5} {}", record.level(), record.args()));
    builder.init();
}

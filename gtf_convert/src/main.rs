use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use gtf_lib::{ConvertOptions, Dds, Gtf, dds_to_gtf, gtf_to_dds, pack_gtf};
use rayon::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// A .dds or .gtf file, or a folder to process recursively.
    input: String,

    /// Output path; derived from the input path when omitted.
    #[arg(long)]
    output: Option<String>,

    /// Keep uncompressed textures in a linear layout.
    #[arg(long)]
    linearize: bool,

    /// Mark textures for unnormalized coordinate sampling.
    #[arg(long)]
    unnormalize: bool,

    /// Texture id to extract when converting from GTF.
    #[arg(long, default_value_t = 0)]
    texture: u32,

    /// Pack every DDS file under the input folder into one GTF.
    #[arg(long)]
    pack: bool,

    /// Convert, convert back, and report payload differences instead of
    /// writing output files.
    #[arg(long)]
    check: bool,
}

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let cli = Cli::parse();
    let input = Path::new(&cli.input);
    let options = ConvertOptions {
        linearize: cli.linearize,
        unnormalize: cli.unnormalize,
    };

    let start = std::time::Instant::now();
    if cli.pack {
        pack_folder(input, cli.output.as_deref(), &options)?;
    } else if input.is_dir() {
        convert_all(input, &options, cli.texture, cli.check);
    } else {
        convert_file(input, cli.output.as_deref(), &options, cli.texture, cli.check)?;
    }
    log::info!("Finished in {:?}", start.elapsed());
    Ok(())
}

fn pack_folder(
    root: &Path,
    output: Option<&str>,
    options: &ConvertOptions,
) -> anyhow::Result<()> {
    let mut paths: Vec<PathBuf> = globwalk::GlobWalkerBuilder::from_patterns(root, &["*.dds"])
        .build()?
        .filter_map(|entry| entry.ok().map(|e| e.path().to_owned()))
        .collect();
    paths.sort();
    if paths.is_empty() {
        bail!("no .dds files under {root:?}");
    }

    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        images.push(Dds::from_file(path).with_context(|| format!("error reading {path:?}"))?);
    }
    let gtf = pack_gtf(&images, options)?;

    let output = output.map(PathBuf::from).unwrap_or_else(|| root.join("packed.gtf"));
    gtf.save(&output)?;
    log::info!("Packed {} textures into {output:?}", images.len());
    Ok(())
}

fn convert_all(root: &Path, options: &ConvertOptions, texture: u32, check: bool) {
    globwalk::GlobWalkerBuilder::from_patterns(root, &["*.{dds,gtf}"])
        .build()
        .unwrap()
        .par_bridge()
        .for_each(|entry| {
            let Ok(entry) = entry else {
                return;
            };
            let path = entry.path();
            if let Err(e) = convert_file(path, None, options, texture, check) {
                log::error!("Error converting {path:?}: {e}");
            }
        });
}

fn convert_file(
    path: &Path,
    output: Option<&str>,
    options: &ConvertOptions,
    texture: u32,
    check: bool,
) -> anyhow::Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("dds") => {
            let dds = Dds::from_file(path)?;
            let gtf = dds_to_gtf(&dds, options)?;
            if check {
                let back = gtf_to_dds(&gtf, 0)?;
                if back.data != dds.data {
                    log::error!("Payload not 1:1 for {path:?}");
                }
            } else {
                gtf.save(output_path(path, output, "gtf"))?;
            }
        }
        Some("gtf") => {
            let gtf = Gtf::from_file(path)?;
            let dds = gtf_to_dds(&gtf, texture)?;
            if check {
                let back = dds_to_gtf(&dds, options)?;
                let id = texture;
                let payload = gtf.texture(id).map(|t| t.payload.to_vec());
                let new_payload = back.texture(0).map(|t| t.payload.to_vec());
                if payload != new_payload {
                    log::error!("Payload not 1:1 for {path:?}");
                }
            } else {
                dds.save(output_path(path, output, "dds"))?;
            }
        }
        _ => bail!("unsupported extension for {path:?}"),
    }
    Ok(())
}

fn output_path(input: &Path, output: Option<&str>, extension: &str) -> PathBuf {
    output
        .map(PathBuf::from)
        .unwrap_or_else(|| input.with_extension(extension))
}

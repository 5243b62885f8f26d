use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use mailstyle_lib::CssInliner;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mailstyle")]
#[command(about = "Inline CSS into the style attributes of HTML mails")]
struct Args {
    /// Input HTML files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Stylesheet applied before the documents' own <style> elements.
    #[arg(long = "css", value_name = "FILE")]
    css: Vec<PathBuf>,

    /// Write each result to this directory instead of stdout.
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Also keep @media blocks of this type.
    #[arg(long = "allow-media", value_name = "TYPE")]
    allow_media: Vec<String>,

    /// Drop @media blocks of this type.
    #[arg(long = "deny-media", value_name = "TYPE")]
    deny_media: Vec<String>,

    /// Never add inline styles to elements matching this selector.
    #[arg(long = "exclude", value_name = "SELECTOR")]
    exclude: Vec<String>,

    /// Leave <style> elements alone.
    #[arg(long)]
    no_style_blocks: bool,

    /// Discard existing style attributes.
    #[arg(long)]
    no_inline_styles: bool,

    /// Print only the content of <body>.
    #[arg(long)]
    body_only: bool,

    /// Fail on selectors that cannot be matched.
    #[arg(long)]
    strict: bool,
}

fn main() {
    env_logger::init();

    // parse the args given in terminal
    let args: Args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let css = read_stylesheets(&args.css)?;

    let Some(out_dir) = &args.out_dir else {
        if args.inputs.len() != 1 {
            bail!("--out-dir is required when inlining several files");
        }
        print!("{}", inline_file(&args.inputs[0], &css, args)?);
        return Ok(());
    };

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let failures: Vec<anyhow::Error> = args
        .inputs
        .par_iter()
        .filter_map(|input| write_inlined(input, out_dir, &css, args).err())
        .collect();
    for failure in &failures {
        error!("{:#}", failure);
    }
    if !failures.is_empty() {
        bail!("{} of {} file(s) failed", failures.len(), args.inputs.len());
    }
    Ok(())
}

fn read_stylesheets(paths: &[PathBuf]) -> Result<String> {
    let mut css = String::new();
    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading stylesheet {}", path.display()))?;
        css.push_str(&content);
        css.push('\n');
    }
    Ok(css)
}

fn configure(inliner: &mut CssInliner, args: &Args) {
    for media_type in &args.allow_media {
        inliner.add_allowed_media_type(media_type);
    }
    for media_type in &args.deny_media {
        inliner.remove_allowed_media_type(media_type);
    }
    for selector in &args.exclude {
        inliner.add_excluded_selector(selector);
    }
    if args.no_style_blocks {
        inliner.disable_style_blocks_parsing();
    }
    if args.no_inline_styles {
        inliner.disable_inline_style_attributes_parsing();
    }
    inliner.set_debug(args.strict);
}

fn inline_file(input: &Path, css: &str, args: &Args) -> Result<String> {
    let html = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let mut inliner = CssInliner::from_html(&html);
    configure(&mut inliner, args);
    inliner
        .inline_css(css)
        .with_context(|| format!("inlining CSS into {}", input.display()))?;
    let rendered = if args.body_only {
        inliner.render_body_content()
    } else {
        inliner.render()
    };
    rendered.with_context(|| format!("serializing {}", input.display()))
}

fn write_inlined(input: &Path, out_dir: &Path, css: &str, args: &Args) -> Result<()> {
    let Some(file_name) = input.file_name() else {
        bail!("{} is not a file", input.display());
    };
    let output = inline_file(input, css, args)?;
    let target = out_dir.join(file_name);
    fs::write(&target, output).with_context(|| format!("writing {}", target.display()))?;
    info!("{} -> {}", input.display(), target.display());
    Ok(())
}

//! Render a template JSON and a record JSON to a PDF file
//!
//! Run with:
//! cargo run -p template --example render_json -- template.json data.json out.pdf [latin.ttf] [ideographic.ttf]
//!
//! Without font files the built-in Helvetica is used, which covers ASCII text only.

use std::error::Error;
use std::fs;

use template::{parse_record, parse_template, render_template_to_pdf, FontBytes, RenderOptions};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: render_json <template.json> <data.json> <out.pdf> [latin.ttf] [ideographic.ttf]");
        std::process::exit(2);
    }

    let template = parse_template(&fs::read_to_string(&args[0])?)?;
    let record = parse_record(&fs::read_to_string(&args[1])?)?;
    let latin = args.get(3).map(fs::read).transpose()?.unwrap_or_default();
    let ideographic = args.get(4).map(fs::read).transpose()?.unwrap_or_default();

    let options = RenderOptions::new()
        .with_debug(std::env::var_os("RENDER_DEBUG").is_some())
        .with_request_id("cli");
    let output = render_template_to_pdf(
        &template,
        Some(&record),
        FontBytes {
            latin: &latin,
            ideographic: &ideographic,
        },
        options,
    )?;

    fs::write(&args[2], &output.bytes)?;
    println!(
        "{}: {} pages, {} bytes",
        args[2],
        output.page_count,
        output.bytes.len()
    );
    for warning in &output.warnings {
        println!("  {warning}");
    }
    Ok(())
}

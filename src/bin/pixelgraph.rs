use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use pixelgraph::{
    Color, GraphDocument, KeyFrameTime, NodeGraph, NodeRegistry, PixelSize, RenderContext,
    ResolutionTier,
};

#[derive(Parser, Debug)]
#[command(name = "pixelgraph", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a graph for one frame and write the output as a PNG.
    Render(RenderArgs),
    /// List the built-in node types.
    Nodes,
    /// Print the demo graph as a JSON document.
    Document(DocumentArgs),
}

#[derive(Parser, Debug)]
struct DemoArgs {
    /// Document edge length in pixels.
    #[arg(long, default_value_t = 32)]
    size: u32,

    /// Fill color of the flat-color node (hex).
    #[arg(long, default_value = "#ff0000")]
    color: String,

    /// Tint color (hex).
    #[arg(long, default_value = "#ffffff")]
    tint: String,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Graph document JSON. The demo graph is rendered when omitted.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Frame index.
    #[arg(long, default_value_t = 0)]
    frame: i32,

    /// Resolution tier.
    #[arg(long, value_enum, default_value_t = Resolution::Full)]
    resolution: Resolution,

    #[command(flatten)]
    demo: DemoArgs,
}

#[derive(Parser, Debug)]
struct DocumentArgs {
    /// Write to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    demo: DemoArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Resolution {
    Full,
    Half,
    Quarter,
    Eighth,
}

impl From<Resolution> for ResolutionTier {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Full => Self::Full,
            Resolution::Half => Self::Half,
            Resolution::Quarter => Self::Quarter,
            Resolution::Eighth => Self::Eighth,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Nodes => cmd_nodes(),
        Command::Document(args) => cmd_document(args),
    }
}

fn parse_color(s: &str) -> anyhow::Result<Color> {
    Color::from_hex(s).map_err(|e| anyhow::anyhow!("invalid color '{s}': {e}"))
}

/// Flat color -> tint -> output.
fn demo_graph(args: &DemoArgs) -> anyhow::Result<NodeGraph> {
    let registry = NodeRegistry::builtin()?;
    let mut graph = NodeGraph::new();

    let mut fill = registry.create("FlatColor")?;
    fill.set_input_value("Color", parse_color(&args.color)?)?;
    let mut tint = registry.create("Tint")?;
    tint.set_input_value("Tint", parse_color(&args.tint)?)?;
    let output = registry.create("Output")?;

    let fill_out = fill.output("Output")?;
    let tint_in = tint.input("Image")?;
    let tint_out = tint.output("Output")?;
    let output_in = output.input("Background")?;

    graph.add_node(fill)?;
    graph.add_node(tint)?;
    let output_id = graph.add_node(output)?;
    graph.connect(fill_out, tint_in)?;
    graph.connect(tint_out, output_in)?;
    graph.set_output_node(output_id)?;
    Ok(graph)
}

fn read_document(path: &Path) -> anyhow::Result<NodeGraph> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read document '{}'", path.display()))?;
    let doc = GraphDocument::from_json(&json)?;
    Ok(NodeGraph::from_document(&doc, &NodeRegistry::builtin()?)?)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut graph = match &args.in_path {
        Some(path) => read_document(path)?,
        None => demo_graph(&args.demo)?,
    };
    let ctx = RenderContext::new(PixelSize::new(args.demo.size, args.demo.size))
        .with_frame_time(KeyFrameTime::new(args.frame))
        .with_resolution(args.resolution.into());
    let frame = graph
        .render_snapshot(&ctx)?
        .context("graph produced no image for this frame")?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame.save_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_nodes() -> anyhow::Result<()> {
    for info in NodeRegistry::builtin()?.types() {
        println!(
            "{:<18} {:<20} {}",
            info.unique_name, info.display_name, info.category
        );
    }
    Ok(())
}

fn cmd_document(args: DocumentArgs) -> anyhow::Result<()> {
    let json = demo_graph(&args.demo)?.to_document()?.to_json()?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("write '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

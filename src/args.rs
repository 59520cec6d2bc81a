use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Camera index override for the forward-facing device
    #[arg(short, long)]
    pub camera: Option<u32>,

    /// Landmark table variant (basic, composite)
    #[arg(long)]
    pub variant: Option<String>,

    /// Path to the face mesh ONNX model
    #[arg(long)]
    pub model: Option<String>,

    /// Run without a model file, using the simulated face
    #[arg(long, default_value_t = false)]
    pub synthetic: bool,

    /// Draw all landmark indices on the reported frame
    #[arg(long, default_value_t = false)]
    pub overlay: bool,

    /// Start with the world-facing camera
    #[arg(long, default_value_t = false)]
    pub backward: bool,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<String>,

    /// List available cameras
    #[arg(long)]
    pub list: bool,
}

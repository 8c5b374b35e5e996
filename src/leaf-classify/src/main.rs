use leaf_serve::{Classifier, Crop, SavedModel};
use std::error::Error;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

use log::info;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "leaf-classify",
    about = "CLI app to diagnose a plant disease from a single leaf photo"
)]
struct CmdArgs {
    #[structopt(
        parse(from_os_str),
        help = "Directory holding one SavedModel export per crop"
    )]
    models_dir: PathBuf,

    #[structopt(help = "Plant the leaf belongs to: Corn, Apple, Tomato or Potato")]
    crop: Crop,

    #[structopt(help = "Path or http(s) URL of the leaf photo")]
    image: String,
}

fn is_url(image: &str) -> bool {
    image.starts_with("http://") || image.starts_with("https://")
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let model = SavedModel::load(&args.models_dir.join(args.crop.model_dir_name()))?;
    let classifier = Classifier::new(args.crop, Box::new(model));

    let prediction = if is_url(&args.image) {
        classifier.classify_from_url(&args.image)?
    } else {
        classifier.classify_from_path(Path::new(&args.image))?
    };

    info!("{}", serde_json::to_string(&prediction)?);
    println!("{}", prediction);

    Ok(())
}

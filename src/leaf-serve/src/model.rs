use std::os::raw::c_int;
use std::path::Path;

use log::debug;
use tensorflow::{Graph, SavedModelBundle, Session, SessionOptions, SessionRunArgs, Tensor};

use crate::{Error, Result, Timer};

const SERVE_TAG: &str = "serve";
const SERVING_SIGNATURE: &str = "serving_default";

/// A pretrained image classifier.
pub trait Model: Send + Sync {
    /// Runs one `side` x `side` RGB image (HWC, row-major) through the model
    /// and returns its raw output scores.
    fn forward(&self, image: &[f32], side: u32) -> Result<Vec<f32>>;
}

/// Model exported in the TensorFlow SavedModel format.
pub struct SavedModel {
    /// TensorFlow model graph
    graph: Graph,

    /// TensorFlow session
    session: Session,

    /// Operation fed with the image batch
    input: String,
    input_index: c_int,

    /// Operation holding the class scores
    output: String,
    output_index: c_int,
}

impl SavedModel {
    pub fn load(export_dir: &Path) -> Result<Self> {
        let mut t = Timer::new_start(&format!("Loading model {}", export_dir.display()));

        let mut graph = Graph::new();
        let bundle =
            SavedModelBundle::load(&SessionOptions::new(), &[SERVE_TAG], &mut graph, export_dir)
                .map_err(|source| Error::ModelLoad {
                    path: export_dir.to_path_buf(),
                    source,
                })?;

        // Keras exports name their tensors after the layers, so take whatever
        // the single input and output of the serving signature are called.
        let signature = bundle.meta_graph_def().get_signature(SERVING_SIGNATURE)?;
        let input_info = signature
            .inputs()
            .values()
            .next()
            .ok_or(Error::Signature("input"))?;
        let output_info = signature
            .outputs()
            .values()
            .next()
            .ok_or(Error::Signature("output"))?;

        debug!(
            "{}: feeding {}:{}, fetching {}:{}",
            export_dir.display(),
            input_info.name().name,
            input_info.name().index,
            output_info.name().name,
            output_info.name().index
        );

        // Fail at startup rather than on the first request.
        graph.operation_by_name_required(&input_info.name().name)?;
        graph.operation_by_name_required(&output_info.name().name)?;

        let input = input_info.name().name.clone();
        let input_index = input_info.name().index;
        let output = output_info.name().name.clone();
        let output_index = output_info.name().index;

        t.stop();

        Ok(SavedModel {
            graph,
            session: bundle.session,
            input,
            input_index,
            output,
            output_index,
        })
    }
}

impl Model for SavedModel {
    fn forward(&self, image: &[f32], side: u32) -> Result<Vec<f32>> {
        let side = u64::from(side);
        let expected = (side * side * 3) as usize;
        if image.len() != expected {
            return Err(Error::InputSize {
                expected,
                actual: image.len(),
            });
        }

        let input = Tensor::new(&[1, side, side, 3]).with_values(image)?;

        let mut args = SessionRunArgs::new();
        args.add_feed(
            &self.graph.operation_by_name_required(&self.input)?,
            self.input_index,
            &input,
        );
        let result = args.request_fetch(
            &self.graph.operation_by_name_required(&self.output)?,
            self.output_index,
        );

        self.session.run(&mut args)?;
        let output: Tensor<f32> = args.fetch(result)?;

        Ok(output.to_vec())
    }
}

pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod postal;
pub mod progress;

pub use constants::*;
pub use coordinates::{great_circle_distance, round_to, validate_coordinates};
pub use filename::{
    checkpoint_path_for, default_results_filename_in, find_checkpoints,
    generate_default_results_filename, results_path_for_checkpoint,
};
pub use postal::normalize_postal_code;
pub use progress::ProgressReporter;

pub mod export;
pub mod store;

pub use export::{
    GridMesh, MeshAxis, export_grid_per_tap, export_records_csv, grid_file_name,
    write_deviation_csv, write_grid_csv, write_plot_csv, write_records_csv,
};
pub use store::{load_points, read_points_json, save_points, write_points_json};

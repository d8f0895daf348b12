//! morsel-uv CLI - UV unwrapping and packing command-line tool.
//!
//! Usage: morsel-uv <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `morsel-uv --help` for available commands. Set `RUST_LOG=debug` for
//! per-operation statistics.

use std::path::PathBuf;
use std::time::Instant;
use std::result::Result;

use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Vector2;

use morsel_uv::algo::uv::util::{surface_area, uv_area, uv_bounds};
use morsel_uv::algo::uv::{TransferOptions, UvTransfer};
use morsel_uv::geom::Frame3;
use morsel_uv::io;
use morsel_uv::mesh::{mesh_components, uv_islands};
use morsel_uv::prelude::*;

#[derive(Parser)]
#[command(name = "morsel-uv")]
#[command(author, version, about = "UV unwrapping and packing CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh and UV layer information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Generate new UVs
    Unwrap {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Unwrapping method
        #[arg(short, long, value_enum, default_value = "conformal")]
        method: UnwrapMethod,

        /// Pack the result into the unit square
        #[arg(long)]
        pack: bool,

        /// Packing raster resolution
        #[arg(short, long, default_value = "512")]
        resolution: usize,

        /// Gap between packed islands, in raster pixels
        #[arg(short, long, default_value = "2.0")]
        gutter: f64,
    },

    /// Pack existing UV islands
    Pack {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Pack into UDIM tile U V instead of the unit square
        #[arg(long, num_args = 2, value_names = ["U", "V"], conflicts_with = "stack")]
        udim: Option<Vec<i32>>,

        /// Stack every island at the origin instead of packing
        #[arg(long)]
        stack: bool,

        /// Packing raster resolution
        #[arg(short, long, default_value = "512")]
        resolution: usize,

        /// Gap between packed islands, in raster pixels
        #[arg(short, long, default_value = "2.0")]
        gutter: f64,
    },

    /// Rebuild UVs of a dense mesh from a simplified one with the same vertex positions
    Transfer {
        /// Simplified mesh with UVs
        source: PathBuf,

        /// Dense mesh to receive the UVs
        destination: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Largest distance between corresponding vertices
        #[arg(long, default_value = "1e-5")]
        radius: f64,

        /// Weight steering seam paths along the source edges
        #[arg(long, default_value = "0.0")]
        similarity: f64,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum UnwrapMethod {
    /// One island per triangle
    PerTriangle,
    /// Planar projection along the z axis
    Planar,
    /// Box projection over the bounding box
    Box,
    /// Cylinder projection around the z axis
    Cylinder,
    /// Discrete exponential map per connected component
    ExpMap,
    /// Natural conformal map per connected component
    Conformal,
    /// Spectral conformal map per connected component
    Spectral,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => cmd_info(&input)?,

        Commands::Unwrap {
            input,
            output,
            method,
            pack,
            resolution,
            gutter,
        } => cmd_unwrap(&input, &output, method, pack, resolution, gutter)?,

        Commands::Pack {
            input,
            output,
            udim,
            stack,
            resolution,
            gutter,
        } => {
            let tile = udim.map(|t| (t[0], t[1]));
            cmd_pack(&input, &output, tile, stack, resolution, gutter)?
        }

        Commands::Transfer {
            source,
            destination,
            output,
            radius,
            similarity,
        } => cmd_transfer(&source, &destination, &output, radius, similarity)?,
    }

    Ok(())
}

fn cmd_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let uv_mesh: UvMesh = io::load_uv(input)?;
    let mesh = uv_mesh.mesh();
    let faces: Vec<FaceId> = mesh.face_ids().collect();

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Edges: {}", mesh.num_edges());
    println!("Surface area: {:.6}", mesh.surface_area());
    println!("Components: {}", mesh_components(mesh).len());
    let loops = mesh.boundary_loops();
    if loops.is_empty() {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary loops)", loops.len());
    }

    for layer in 0..uv_mesh.num_uv_layers() {
        let Some(overlay) = uv_mesh.uv_layer(layer) else {
            continue;
        };
        let set = overlay.set_triangle_ids().count();
        println!("\nUV layer {}:", layer);
        println!("  Elements: {}", overlay.element_count());
        println!("  Faces with UVs: {} of {}", set, mesh.num_faces());
        if set == 0 {
            continue;
        }
        let seams = mesh.edge_ids().filter(|&e| overlay.is_seam_edge(mesh, e)).count();
        println!("  Islands: {}", uv_islands(mesh, overlay, None).len());
        println!("  Seam edges: {}", seams);
        println!(
            "  UV area: {:.6} (3D area {:.6})",
            uv_area(overlay, &faces),
            surface_area(mesh, &faces)
        );
        if let Some((lo, hi)) = uv_bounds(overlay, &faces) {
            println!("  UV bounds: ({:.4}, {:.4}) to ({:.4}, {:.4})", lo.x, lo.y, hi.x, hi.y);
        }
    }

    Ok(())
}

fn cmd_unwrap(
    input: &PathBuf,
    output: &PathBuf,
    method: UnwrapMethod,
    pack: bool,
    resolution: usize,
    gutter: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut uv_mesh: UvMesh = io::load_uv(input)?;
    println!(
        "Loaded: {} vertices, {} faces",
        uv_mesh.mesh().num_vertices(),
        uv_mesh.mesh().num_faces()
    );

    let (lo, hi) = uv_mesh.mesh().bounding_box().ok_or(MeshError::EmptyMesh)?;
    let frame = Frame3::new(nalgebra::center(&lo, &hi));
    let extent = (hi - lo).map(|d| if d > 1e-12 { d } else { 1.0 });
    let components = mesh_components(uv_mesh.mesh());
    let faces: Vec<FaceId> = uv_mesh.mesh().face_ids().collect();

    let mut editor = UvEditor::new(&mut uv_mesh, 0, false)?;
    editor.reset_uvs();

    let start = Instant::now();
    let mut failures = 0;
    match method {
        UnwrapMethod::PerTriangle => editor.set_per_triangle_uvs(None, 1.0, None)?,
        UnwrapMethod::Planar => editor.set_triangle_uvs_from_projection(
            &faces,
            |p| *p,
            &frame,
            Vector2::new(extent.x, extent.y),
            None,
        )?,
        UnwrapMethod::Box => {
            editor.set_triangle_uvs_from_box_projection(&faces, |p| *p, &frame, extent, 2, None)?
        }
        UnwrapMethod::Cylinder => editor.set_triangle_uvs_from_cylinder_projection(
            &faces,
            |p| *p,
            &frame,
            extent,
            45.0,
            None,
        )?,
        UnwrapMethod::ExpMap | UnwrapMethod::Conformal | UnwrapMethod::Spectral => {
            let expmap = ExpMapOptions::default().with_normal_smoothing_rounds(2);
            let conformal =
                ConformalOptions::default().with_spectral(method == UnwrapMethod::Spectral);
            for component in &components {
                let outcome = if method == UnwrapMethod::ExpMap {
                    editor.set_triangle_uvs_from_exp_map(component, &expmap, None)
                } else {
                    editor.set_triangle_uvs_from_conformal(component, &conformal, None)
                };
                if let Err(e) = outcome {
                    eprintln!("Warning: component of {} faces: {}", component.len(), e);
                    failures += 1;
                }
            }
        }
    }

    if pack {
        println!("Packing ({}px, gutter {})...", resolution, gutter);
        editor.quick_pack(resolution, gutter)?;
    }
    let elapsed = start.elapsed();

    if failures > 0 {
        println!("{} of {} components failed", failures, components.len());
    }
    io::save_uv(&uv_mesh, 0, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_pack(
    input: &PathBuf,
    output: &PathBuf,
    tile: Option<(i32, i32)>,
    stack: bool,
    resolution: usize,
    gutter: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut uv_mesh: UvMesh = io::load_uv(input)?;
    let mut editor = UvEditor::new(&mut uv_mesh, 0, false)?;
    let islands = uv_islands(editor.mesh(), editor.overlay(), None).len();
    if islands == 0 {
        return Err(MeshError::EmptySelection.into());
    }
    println!("Loaded: {} islands", islands);

    let start = Instant::now();
    match (tile, stack) {
        (_, true) => editor.stack_pack(None)?,
        (Some(tile), false) => editor.udim_pack(tile, resolution, gutter, None)?,
        (None, false) => editor.quick_pack(resolution, gutter)?,
    }
    let elapsed = start.elapsed();

    io::save_uv(&uv_mesh, 0, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_transfer(
    source: &PathBuf,
    destination: &PathBuf,
    output: &PathBuf,
    radius: f64,
    similarity: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let source: UvMesh = io::load_uv(source)?;
    let mut target: UvMesh = io::load_uv(destination)?;
    println!(
        "Loaded: source {} faces, destination {} faces",
        source.mesh().num_faces(),
        target.mesh().num_faces()
    );

    let options = TransferOptions::default()
        .with_vertex_search_radius(radius)
        .with_path_similarity_weight(similarity);
    let start = Instant::now();
    let outcome = UvTransfer::new(&source, 0, &mut target, 0, options)?.transfer_seams_and_uvs();
    let elapsed = start.elapsed();
    if let Err(e) = outcome {
        eprintln!("Warning: transfer incomplete: {}", e);
    }

    io::save_uv(&target, 0, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

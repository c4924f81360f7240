use core::f64::consts::PI;
use std::path::Path;
use std::time::Instant;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::array::{self, Array3};
use crate::config::{Config, Status};
use crate::database::{BlockIndex, Database, Edge, Field};
use crate::error::Error;
use crate::hydro::{Primitive, SourceTerms, GAMMA_LAW_INDEX};
use crate::mesh;
use crate::output;
use crate::scheduler::Scheduler;
use crate::solver::{advance, MeshGeometry, NUM_GUARD};
use crate::thread_pool::ThreadPool;




/**
 * Everything the scheduler's tasks need to see: the configuration, the run
 * status, and the fluid state.
 */
pub struct Simulation {
    pub config: Config,
    pub status: Status,
    pub database: Database,
}




/**
 * The initial model: a spherically symmetric power-law atmosphere in
 * near-hydrostatic balance around the unit point mass, with an optional
 * density jitter drawn from a seeded generator.
 */
struct Atmosphere {
    noise: f64,
}




// ============================================================================
impl Atmosphere {
    fn primitive_at(&self, r: f64, rng: &mut StdRng) -> Primitive {
        let a = 1.5;                    // density index, alpha
        let vf = (1.0 / r).sqrt();      // free-fall velocity (GM = 1)
        let cs = vf / f64::sqrt(a);     // sound speed via Virial condition
        let dg = r.powf(-a);            // power-law everywhere
        let pg = dg * cs * cs / GAMMA_LAW_INDEX;
        let delta = self.noise * rng.gen::<f64>();
        Primitive(dg + delta, 0.0, 0.0, 0.0, pg)
    }
}




// ============================================================================
/**
 * Supplies guard-zone slabs at the open radial edges: reflecting at the
 * inner boundary, zero-gradient at the outer. The polar edges decline; the
 * solver applies its own zero-flux policy there.
 */
pub fn boundary_value(_: BlockIndex, edge: Edge, depth: usize, patch: &Array3) -> Array3 {
    match edge {
        Edge::Il => reflecting_inner(patch, depth),
        Edge::Ir => zero_gradient_outer(patch, depth),
        Edge::Jl | Edge::Jr => Array3::empty(),
    }
}


fn reflecting_inner(patch: &Array3, depth: usize) -> Array3 {
    let (_, nj, nk) = patch.dim();
    Array3::from_slice_function((depth, nj, nk), |(i, j), u| {
        u.copy_from_slice(patch.slice(depth - 1 - i, j));
        u[1] = -u[1];
    })
}


fn zero_gradient_outer(patch: &Array3, depth: usize) -> Array3 {
    let (ni, nj, nk) = patch.dim();
    Array3::from_slice_function((depth, nj, nk), |(_, j), u| {
        u.copy_from_slice(patch.slice(ni - 1, j))
    })
}




// ============================================================================
/**
 * Build the patch database: load every patch from the restart tree if one
 * is configured, otherwise generate the mesh geometry and the initial
 * condition block by block.
 */
pub fn create_database(config: &Config) -> Result<Database, Error> {
    let (ni, nj) = config.block_size();
    let mut database = Database::new(ni, nj);

    if !config.restart.is_empty() {
        output::load_patches(&mut database, Path::new(&config.restart))?;
    } else {
        let atmosphere = Atmosphere { noise: config.noise };
        let mut rng = StdRng::seed_from_u64(config.seed as u64);
        let nb = config.num_blocks;

        for b in 0..nb {
            let r0 = config.outer_radius.powf(b as f64 / nb as f64);
            let r1 = config.outer_radius.powf((b + 1) as f64 / nb as f64);

            let verts = mesh::vertices(ni, nj, [r0, r1, 0.0, PI]);
            let cells = mesh::cell_centroids(&verts);
            let conserved = array::map(cells.view(), 5, |x, u| {
                atmosphere
                    .primitive_at(x[0], &mut rng)
                    .to_conserved(GAMMA_LAW_INDEX)
                    .write_to_slice(u)
            });

            let block = (b, 0, 0);
            database.insert(block, Field::CellCoords, cells);
            database.insert(block, Field::CellVolume, mesh::cell_volumes(&verts));
            database.insert(block, Field::FaceAreaI, mesh::face_areas_i(&verts));
            database.insert(block, Field::FaceAreaJ, mesh::face_areas_j(&verts));
            database.insert(block, Field::VertCoords, verts);
            database.insert(block, Field::Conserved, conserved);
        }
    }
    database.set_boundary_value(Box::new(boundary_value));
    Ok(database)
}




// ============================================================================
fn update_threaded(
    pool: &ThreadPool,
    source_terms: SourceTerms,
    database: &mut Database,
    dt: f64,
    rk_weight: f64,
) -> Result<(), Error> {
    let blocks: Vec<_> = database.all(Field::Conserved).map(|(b, _)| b).collect();
    let mut results = Vec::with_capacity(blocks.len());

    for block in blocks {
        let u = database.fetch(block, NUM_GUARD, NUM_GUARD, 0, 0);
        let geometry = MeshGeometry::for_block(database, block);
        let handle = pool.spawn(move || advance(source_terms, &u, &geometry, dt));
        results.push((block, handle));
    }
    for (block, handle) in results {
        let u1 = handle.recv().expect("a worker died without reporting a result")?;
        database.commit(block, u1, rk_weight);
    }
    Ok(())
}


/**
 * Advance the whole database through one time step at the configured
 * Runge-Kutta order: a single Euler stage, or an Euler stage followed by
 * the half-weight corrector of Heun's method.
 */
pub fn update(
    pool: &ThreadPool,
    source_terms: SourceTerms,
    database: &mut Database,
    dt: f64,
    rk: i64,
) -> Result<(), Error> {
    match rk {
        1 => update_threaded(pool, source_terms, database, dt, 0.0),
        2 => {
            update_threaded(pool, source_terms, database, dt, 0.0)?;
            update_threaded(pool, source_terms, database, dt, 0.5)
        }
        _ => Err(Error::InvalidRungeKutta(rk)),
    }
}




// ============================================================================
/**
 * Run a simulation to completion: initialize from the configuration or a
 * checkpoint, then advance to the final time, dispatching the output tasks
 * on their simulation-time intervals. The scheduler fires once before the
 * first iteration and once after the last.
 */
pub fn run(config: Config) -> Result<(), Error> {
    let config = config.validate()?;
    let status = Status::from_config(&config)?;
    let database = create_database(&config)?;

    let mut scheduler: Scheduler<Simulation> = Scheduler::new();

    scheduler.repeat("write vtk", config.vtki, status.vtk_count, |sim, count| {
        sim.status.vtk_count = count + 1;
        output::write_vtk(&sim.database, &sim.config, count)
    });
    scheduler.repeat("write checkpoint", config.cpi, status.chkpt_count, |sim, count| {
        sim.status.chkpt_count = count + 1;
        output::write_checkpoint(&sim.database, &sim.config, &sim.status, count)
    });

    let source_terms = SourceTerms {
        heating_rate: config.heating_rate,
        cooling_rate: config.cooling_rate,
    };
    let dt = config.time_step_size();
    let pool = ThreadPool::new(config.num_threads as usize);

    println!();
    print!("{}", config);
    print!("{}", status);
    print!("{}", database);
    print!("{}", scheduler);
    println!("{}", "=".repeat(52));
    println!("Main loop:\n");

    let mut sim = Simulation {
        config,
        status,
        database,
    };

    while sim.status.time < sim.config.tfinal {
        let time = sim.status.time;
        scheduler.dispatch(&mut sim, time)?;

        let start = Instant::now();
        update(&pool, source_terms, &mut sim.database, dt, sim.config.rk)?;

        let step_seconds = start.elapsed().as_secs_f64();
        sim.status.time += dt;
        sim.status.iter += 1;
        sim.status.wall += step_seconds;

        let kzps = sim.database.num_cells(Field::Conserved) as f64 / 1e3 / step_seconds;
        println!("[{:04}] t={:.3} kzps={:.2}", sim.status.iter, sim.status.time, kzps);
    }
    let time = sim.status.time;
    scheduler.dispatch(&mut sim, time)?;

    println!();
    println!("{}", "=".repeat(52));
    println!("Run completed:\n");
    println!(
        "\taverage kzps={:.2}\n",
        sim.database.num_cells(Field::Conserved) as f64 / 1e3 / sim.status.wall
            * sim.status.iter as f64);

    Ok(())
}

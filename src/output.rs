use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use crate::array::{self, Array3};
use crate::config::{Config, Status};
use crate::database::{BlockIndex, Database, Field};
use crate::error::Error;
use crate::hydro::{Conserved, GAMMA_LAW_INDEX};




// ============================================================================
/**
 * The legacy VTK format requires big-endian binary payloads regardless of
 * the host byte order, so every word is byte-reversed on the way out.
 */
fn write_swapped_bytes<W: Write>(stream: &mut W, buffer: &[f32]) -> Result<(), Error> {
    let mut bytes = Vec::with_capacity(buffer.len() * 4);
    for x in buffer {
        bytes.extend_from_slice(&x.to_be_bytes());
    }
    stream.write_all(&bytes)?;
    Ok(())
}


fn write_scalar_field<W, F>(
    stream: &mut W,
    name: &str,
    prim: &Array3,
    component: F,
) -> Result<(), Error>
where
    W: Write,
    F: Fn(&[f64]) -> f64,
{
    let (ni, nj, _) = prim.dim();
    let mut buffer = Vec::with_capacity(ni * nj);

    writeln!(stream, "SCALARS {} FLOAT 1", name)?;
    writeln!(stream, "LOOKUP_TABLE default")?;

    for j in 0..nj {
        for i in 0..ni {
            buffer.push(component(prim.slice(i, j)) as f32)
        }
    }
    write_swapped_bytes(stream, &buffer)
}




/**
 * Write one structured-grid snapshot: the vertex grid reprojected to
 * Cartesian coordinates (`x = r sin(theta)`, `z = r cos(theta)`), then the
 * density, radial velocity, and pressure as cell data.
 */
pub fn write_vtk(database: &Database, config: &Config, count: i32) -> Result<(), Error> {
    let filename = config.filename_vtk(count);
    log::info!("write VTK {}", filename.display());
    fs::create_dir_all(&config.outdir)?;

    let file = fs::File::create(filename)?;
    let mut stream = BufWriter::new(file);

    let vert = database.assemble(0, config.num_blocks, 0, 1, 0, Field::VertCoords);
    let (mi, mj, _) = vert.dim();

    writeln!(stream, "# vtk DataFile Version 3.0")?;
    writeln!(stream, "My Data")?;
    writeln!(stream, "BINARY")?;
    writeln!(stream, "DATASET STRUCTURED_GRID")?;
    writeln!(stream, "DIMENSIONS {} {} 1", mi, mj)?;
    writeln!(stream, "POINTS {} FLOAT", mi * mj)?;

    let mut buffer = Vec::with_capacity(mi * mj * 3);
    for j in 0..mj {
        for i in 0..mi {
            let r = vert[(i, j, 0)];
            let q = vert[(i, j, 1)];
            buffer.push((r * q.sin()) as f32);
            buffer.push(0.0);
            buffer.push((r * q.cos()) as f32);
        }
    }
    write_swapped_bytes(&mut stream, &buffer)?;

    let cons = database.assemble(0, config.num_blocks, 0, 1, 0, Field::Conserved);
    let prim = array::try_map(cons.view(), 5, |u, p| {
        Conserved::from_slice(u)
            .to_primitive(GAMMA_LAW_INDEX)?
            .write_to_slice(p);
        Ok::<(), Error>(())
    })?;

    writeln!(stream, "CELL_DATA {}", prim.dim().0 * prim.dim().1)?;
    write_scalar_field(&mut stream, "density", &prim, |p| p[0])?;
    write_scalar_field(&mut stream, "radial_velocity", &prim, |p| p[1])?;
    write_scalar_field(&mut stream, "pressure", &prim, |p| p[4])?;

    Ok(())
}




// ============================================================================
/**
 * Write a checkpoint tree: `config.json` and `status.json`, plus one
 * directory per block holding each field's array as raw binary. An existing
 * tree with the same name is replaced.
 */
pub fn write_checkpoint(
    database: &Database,
    config: &Config,
    status: &Status,
    count: i32,
) -> Result<(), Error> {
    let filename = config.filename_chkpt(count);
    log::info!("write checkpoint {}", filename.display());

    if filename.exists() {
        fs::remove_dir_all(&filename)?;
    }
    fs::create_dir_all(&filename)?;

    serde_json::to_writer_pretty(fs::File::create(filename.join("config.json"))?, config)?;
    serde_json::to_writer_pretty(fs::File::create(filename.join("status.json"))?, status)?;

    for ((block, field), array) in database.iter() {
        let dir = filename.join(format!("{}-{}-{}", block.0, block.1, block.2));
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(field.name()), array.to_bytes())?;
    }
    Ok(())
}


/**
 * Walk a checkpoint tree and insert every patch-field array it holds into
 * the database. The JSON documents at the top level are handled separately
 * by the config module and skipped here.
 */
pub fn load_patches(database: &mut Database, filename: &Path) -> Result<(), Error> {
    for entry in fs::read_dir(filename)? {
        let entry = entry?;

        if !entry.file_type()?.is_dir() {
            continue;
        }
        let block = parse_block_index(&entry.file_name().to_string_lossy())?;

        for file in fs::read_dir(entry.path())? {
            let file = file?;
            let name = file.file_name().to_string_lossy().to_string();
            let field = Field::from_name(&name)
                .ok_or_else(|| Error::Checkpoint(format!("unknown field file '{}'", name)))?;
            let array = Array3::from_bytes(&fs::read(file.path())?)?;
            database.insert(block, field, array);
        }
    }
    Ok(())
}


fn parse_block_index(name: &str) -> Result<BlockIndex, Error> {
    let parts: Vec<_> = name.split('-').map(|p| p.parse::<i64>()).collect();
    match parts.as_slice() {
        [Ok(i), Ok(j), Ok(k)] => Ok((*i, *j, *k)),
        _ => Err(Error::Checkpoint(format!("malformed patch directory '{}'", name))),
    }
}

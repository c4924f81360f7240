use core::f64::consts::PI;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::Error;




/**
 * The runtime configuration: a flat record of model and execution
 * parameters, set on the command line as `key=value` pairs and persisted in
 * each checkpoint as `config.json`. Restarted runs load the configuration
 * from the checkpoint first and apply the remaining command line items over
 * it.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub num_blocks: i64,
    pub nr: i64,
    pub outer_radius: f64,
    pub num_threads: i64,
    pub tfinal: f64,
    pub cpi: f64,
    pub vtki: f64,
    pub rk: i64,
    pub heating_rate: f64,
    pub cooling_rate: f64,
    pub noise: f64,
    pub seed: i64,
    pub outdir: String,
    pub restart: String,
}




// ============================================================================
impl Default for Config {
    fn default() -> Self {
        Self {
            num_blocks: 4,
            nr: 32,
            outer_radius: 10.0,
            num_threads: 1,
            tfinal: 1.0,
            cpi: 1.0,
            vtki: 1.0,
            rk: 1,
            heating_rate: 0.0,
            cooling_rate: 0.0,
            noise: 0.0,
            seed: 0,
            outdir: ".".to_string(),
            restart: String::new(),
        }
    }
}




// ============================================================================
impl Config {

    /**
     * Build a configuration from `key=value` command line items. If a
     * `restart` item is present, defaults come from the checkpoint's
     * `config.json` rather than from `Config::default`, and the other items
     * are applied on top.
     */
    pub fn from_args<A: Iterator<Item = String>>(args: A) -> Result<Self, Error> {
        let items = to_string_map_from_key_val_pairs(args)?;

        let mut config = match items.get("restart") {
            Some(restart) if !restart.is_empty() => {
                let mut config = Self::from_json_file(&Path::new(restart).join("config.json"))?;
                config.restart = restart.clone();
                config
            }
            _ => Self::default(),
        };

        for (key, value) in &items {
            config.set(key, value)?
        }
        Ok(config)
    }


    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(|_| {
            Error::config("restart", &format!("file not found: {}", path.display()))
        })?;
        Ok(serde_json::from_reader(file)?)
    }


    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T, Error> {
            value
                .parse()
                .map_err(|_| Error::config(key, &format!("is a badly formed {}", kind)))
        }
        let int = |v| parse::<i64>(key, v, "int");
        let float = |v| parse::<f64>(key, v, "float");

        match key {
            "num_blocks" => self.num_blocks = int(value)?,
            "nr" => self.nr = int(value)?,
            "outer_radius" => self.outer_radius = float(value)?,
            "num_threads" => self.num_threads = int(value)?,
            "tfinal" => self.tfinal = float(value)?,
            "cpi" => self.cpi = float(value)?,
            "vtki" => self.vtki = float(value)?,
            "rk" => self.rk = int(value)?,
            "heating_rate" => self.heating_rate = float(value)?,
            "cooling_rate" => self.cooling_rate = float(value)?,
            "noise" => self.noise = float(value)?,
            "seed" => self.seed = int(value)?,
            "outdir" => self.outdir = value.to_string(),
            "restart" => self.restart = value.to_string(),
            _ => return Err(Error::config(key, "is not a valid key")),
        }
        Ok(())
    }


    pub fn validate(self) -> Result<Self, Error> {
        if self.nr < 4 {
            return Err(Error::config("nr", "must be >= 4"));
        }
        if self.rk != 1 && self.rk != 2 {
            return Err(Error::InvalidRungeKutta(self.rk));
        }
        if self.outer_radius < 2.0 {
            return Err(Error::config("outer_radius", "must be >= 2"));
        }
        if self.num_blocks < 1 {
            return Err(Error::config("num_blocks", "must be >= 1"));
        }
        if self.num_threads < 1 {
            return Err(Error::config("num_threads", "must be >= 1"));
        }
        Ok(self)
    }


    /**
     * The interior shape `(ni, nj)` of each patch. The radial zone target
     * is `nr` zones per decade of radius, split evenly among the blocks.
     */
    pub fn block_size(&self) -> (usize, usize) {
        let target = self.nr as f64 * self.outer_radius.log10();
        let ni = (target / self.num_blocks as f64) as usize;
        (ni, self.nr as usize)
    }


    /**
     * The fixed time step.
     */
    pub fn time_step_size(&self) -> f64 {
        // WARNING: assuming here that speeds are generally <~ 1.
        0.25 * PI / self.nr as f64
    }


    pub fn filename_chkpt(&self, count: i32) -> PathBuf {
        Path::new(&self.outdir).join(format!("chkpt.{:04}", count))
    }


    pub fn filename_vtk(&self, count: i32) -> PathBuf {
        Path::new(&self.outdir).join(format!("{:04}.vtk", count))
    }
}




// ============================================================================
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Config:")?;
        writeln!(f, "\t{:.<24} {}", "num_blocks", self.num_blocks)?;
        writeln!(f, "\t{:.<24} {}", "nr", self.nr)?;
        writeln!(f, "\t{:.<24} {}", "outer_radius", self.outer_radius)?;
        writeln!(f, "\t{:.<24} {}", "num_threads", self.num_threads)?;
        writeln!(f, "\t{:.<24} {}", "tfinal", self.tfinal)?;
        writeln!(f, "\t{:.<24} {}", "cpi", self.cpi)?;
        writeln!(f, "\t{:.<24} {}", "vtki", self.vtki)?;
        writeln!(f, "\t{:.<24} {}", "rk", self.rk)?;
        writeln!(f, "\t{:.<24} {}", "heating_rate", self.heating_rate)?;
        writeln!(f, "\t{:.<24} {}", "cooling_rate", self.cooling_rate)?;
        writeln!(f, "\t{:.<24} {}", "noise", self.noise)?;
        writeln!(f, "\t{:.<24} {}", "seed", self.seed)?;
        writeln!(f, "\t{:.<24} {}", "outdir", self.outdir)?;
        writeln!(f, "\t{:.<24} {}", "restart", self.restart)
    }
}




/**
 * The mutable state of a run outside the fluid data itself: the clock, the
 * accumulated wall time, and the output counters. Persisted in each
 * checkpoint as `status.json`.
 */
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub time: f64,
    pub wall: f64,
    pub iter: i32,
    pub vtk_count: i32,
    pub chkpt_count: i32,
}




// ============================================================================
impl Status {

    /**
     * The initial status for the given configuration: zeros on a fresh
     * start, or the contents of the checkpoint's `status.json` on restart.
     */
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        if config.restart.is_empty() {
            Ok(Self::default())
        } else {
            let path = Path::new(&config.restart).join("status.json");
            let file = std::fs::File::open(&path).map_err(|_| {
                Error::config("restart", &format!("file not found: {}", path.display()))
            })?;
            Ok(serde_json::from_reader(file)?)
        }
    }
}




// ============================================================================
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Status:")?;
        writeln!(f, "\t{:.<24} {}", "time", self.time)?;
        writeln!(f, "\t{:.<24} {}", "wall", self.wall)?;
        writeln!(f, "\t{:.<24} {}", "iter", self.iter)?;
        writeln!(f, "\t{:.<24} {}", "vtk_count", self.vtk_count)?;
        writeln!(f, "\t{:.<24} {}", "chkpt_count", self.chkpt_count)
    }
}




/**
 * Transform a sequence of `key=value` strings into a string map. The result
 * is an error if any item does not have exactly one equals sign, or if a key
 * is repeated.
 */
pub fn to_string_map_from_key_val_pairs<A: Iterator<Item = String>>(
    args: A,
) -> Result<BTreeMap<String, String>, Error> {
    let mut result = BTreeMap::new();

    for arg in args {
        let lr: Vec<&str> = arg.split('=').collect();

        if lr.len() != 2 {
            return Err(Error::config(&arg, "is a badly formed argument"));
        }
        if result.contains_key(lr[0]) {
            return Err(Error::config(lr[0], "is a duplicate parameter"));
        }
        result.insert(lr[0].to_string(), lr[1].to_string());
    }
    Ok(result)
}

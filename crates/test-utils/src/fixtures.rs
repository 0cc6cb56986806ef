//! Common test fixtures for WPS runner tests.
//!
//! This module provides pre-defined namelist documents and a scratch
//! directory layout that mirrors a WPS installation.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A trimmed `namelist.wps` as shipped with WPS 4.x.
///
/// Note the aligned `end_date   =` spacing and the per-domain value lists.
pub const NAMELIST_WPS: &str = "&share
 wrf_core = 'ARW',
 max_dom = 1,
 start_date = '2019-09-04_12:00:00','2019-09-04_12:00:00',
 end_date   = '2019-09-06_00:00:00','2019-09-04_12:00:00',
 interval_seconds = 10800
/

&geogrid
 parent_id         =   1,   1,
 parent_grid_ratio =   1,   3,
 e_we              =  150, 220,
 e_sn              =  130, 214,
 geog_data_res = 'default','default',
 dx = 15000,
 dy = 15000,
 map_proj = 'lambert',
 ref_lat   =  33.00,
 ref_lon   = -79.00,
 truelat1  =  30.0,
 truelat2  =  60.0,
 stand_lon = -79.0,
 geog_data_path = '/glade/work/wrfhelp/WPS_GEOG/'
/

&ungrib
 out_format = 'WPS',
 prefix = 'ERA5',
/

&metgrid
 fg_name = 'ERA5'
/
";

/// A namelist whose `&share` block has no `end_date`.
pub const NAMELIST_WITHOUT_END_DATE: &str = "&share
 wrf_core = 'ARW',
 max_dom = 1,
 start_date = '2019-09-04_12:00:00',
 interval_seconds = 10800
/
";

/// Name of the namelist inside the sandbox base directory.
pub const NAMELIST_FILE: &str = "namelist.wps";

/// Scratch WPS layout inside a temporary directory.
///
/// ```text
/// <tmp>/wps      base (working) directory, holds namelist.wps and scripts
/// <tmp>/era5     raw GRIB source files
/// <tmp>/output   ungrib intermediate files
/// ```
///
/// Everything is removed when the sandbox is dropped.
pub struct WpsSandbox {
    root: TempDir,
    pub base_dir: PathBuf,
    pub grib_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl WpsSandbox {
    /// Create the directory layout and write [`NAMELIST_WPS`].
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create sandbox dir");
        let base_dir = root.path().join("wps");
        let grib_dir = root.path().join("era5");
        let output_dir = root.path().join("output");

        for dir in [&base_dir, &grib_dir, &output_dir] {
            std::fs::create_dir_all(dir).expect("create sandbox subdir");
        }

        let sandbox = Self {
            root,
            base_dir,
            grib_dir,
            output_dir,
        };
        sandbox.write_namelist(NAMELIST_WPS);
        sandbox
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn namelist_path(&self) -> PathBuf {
        self.base_dir.join(NAMELIST_FILE)
    }

    pub fn write_namelist(&self, text: &str) {
        std::fs::write(self.namelist_path(), text).expect("write namelist");
    }

    pub fn read_namelist(&self) -> String {
        std::fs::read_to_string(self.namelist_path()).expect("read namelist")
    }

    /// Sorted names of `GRIBFILE.*` entries in the base directory.
    pub fn grib_links(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.base_dir)
            .expect("read base dir")
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|n| n.starts_with("GRIBFILE."))
            .collect();
        names.sort();
        names
    }
}

impl Default for WpsSandbox {
    fn default() -> Self {
        Self::new()
    }
}

//! City records and the two ways of obtaining them: parsing the world-cities
//! file or synthesizing random points.

use std::{
    fs::File,
    io::Read,
    path::Path,
};

use csv::{ByteRecord, Position, ReaderBuilder};
use rand::RngCore;
use tracing::{debug, info};

use crate::{error::DatasetError, index::Point};

pub const COUNTRY_COLUMN: &str = "Country";
pub const NAME_COLUMN: &str = "Accent City";
pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";

const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Clone, Debug, PartialEq)]
pub struct CityRecord {
    pub country: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CityRecord {
    #[must_use]
    pub fn point(&self) -> Point {
        [self.latitude, self.longitude]
    }
}

/// Ordered, non-empty collection of cities. A record's position is its
/// identifier inside every index built from the dataset.
#[derive(Clone, Debug)]
pub struct Dataset {
    cities: Vec<CityRecord>,
}

impl Dataset {
    pub fn new(cities: Vec<CityRecord>) -> Result<Self, DatasetError> {
        if cities.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Dataset { cities })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityRecord> {
        self.cities.iter()
    }

    /// Coordinates in dataset order, ready to hand to an index build.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        self.cities.iter().map(CityRecord::point).collect()
    }
}

impl std::ops::Index<usize> for Dataset {
    type Output = CityRecord;

    fn index(&self, id: usize) -> &CityRecord {
        &self.cities[id]
    }
}

/// Load the world-cities file at `path`.
pub fn load_cities(path: &Path) -> Result<Dataset, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = parse_cities(file).map_err(|err| match err {
        DatasetError::Read(source) => DatasetError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    info!(path = %path.display(), records = dataset.len(), "loaded cities file");
    Ok(dataset)
}

/// Parse header-first comma-separated city rows. Columns are located by
/// header name, so order and extra columns do not matter.
///
/// Fields are read as raw bytes: text columns that are not valid UTF-8 are
/// decoded as Latin-1, which is how the world-cities file is encoded.
pub fn parse_cities<R: Read>(reader: R) -> Result<Dataset, DatasetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let header = reader.byte_headers().map_err(read_error)?;
    if header.is_empty() {
        return Err(DatasetError::Empty);
    }
    let columns = Columns::locate(header)?;
    debug!(?columns, "located dataset columns");

    let mut cities = Vec::new();
    let mut record = ByteRecord::new();
    while reader.read_byte_record(&mut record).map_err(read_error)? {
        if record.iter().all(|field| trim(field).is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, line_number);
        cities.push(columns.record(&record, line)?);
    }
    Dataset::new(cities)
}

fn line_number(position: &Position) -> usize {
    usize::try_from(position.line()).unwrap_or(usize::MAX)
}

fn read_error(err: csv::Error) -> DatasetError {
    let line = err.position().map_or(0, line_number);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => DatasetError::Read(source),
        _ => DatasetError::Malformed { line, reason },
    }
}

fn trim(field: &[u8]) -> &[u8] {
    let start = field
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(field.len());
    let end = field
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(start, |last| last + 1);
    &field[start..end]
}

fn text(field: &[u8]) -> String {
    let field = trim(field);
    match std::str::from_utf8(field) {
        Ok(text) => text.to_owned(),
        Err(_) => field.iter().copied().map(char::from).collect(),
    }
}

#[derive(Debug)]
struct Columns {
    country: usize,
    name: usize,
    latitude: usize,
    longitude: usize,
    width: usize,
}

impl Columns {
    fn locate(header: &ByteRecord) -> Result<Self, DatasetError> {
        let find = |column: &'static str| {
            header
                .iter()
                .map(|name| trim(name.strip_prefix(BOM).unwrap_or(name)))
                .position(|name| name == column.as_bytes())
                .ok_or(DatasetError::MissingColumn(column))
        };
        let country = find(COUNTRY_COLUMN)?;
        let name = find(NAME_COLUMN)?;
        let latitude = find(LATITUDE_COLUMN)?;
        let longitude = find(LONGITUDE_COLUMN)?;
        let width = country.max(name).max(latitude).max(longitude) + 1;
        Ok(Columns {
            country,
            name,
            latitude,
            longitude,
            width,
        })
    }

    fn record(&self, record: &ByteRecord, line: usize) -> Result<CityRecord, DatasetError> {
        if record.len() < self.width {
            return Err(DatasetError::Malformed {
                line,
                reason: format!("expected at least {} fields, found {}", self.width, record.len()),
            });
        }
        let field = |column: usize| record.get(column).unwrap_or_default();
        let coordinate = |column: usize, label: &str| {
            let raw = text(field(column));
            raw.parse::<f64>().map_err(|err| DatasetError::Malformed {
                line,
                reason: format!("{label} {raw:?}: {err}"),
            })
        };
        Ok(CityRecord {
            country: text(field(self.country)),
            name: text(field(self.name)),
            latitude: coordinate(self.latitude, LATITUDE_COLUMN)?,
            longitude: coordinate(self.longitude, LONGITUDE_COLUMN)?,
        })
    }
}

/// Synthesize `max(1, n)` cities with integer coordinates, latitude in
/// [-90, 89] and longitude in [-180, 179].
///
/// Coordinates are `nonneg mod range - offset` over a 31-bit draw. The
/// modulo bias and duplicate points are kept so generated workloads match
/// the classic `rand() % range` benchmark.
pub fn random_cities<R: RngCore + ?Sized>(n: usize, rng: &mut R) -> Dataset {
    let n = n.max(1);
    let mut cities = Vec::with_capacity(n);
    for _ in 0..n {
        let latitude = f64::from(nonneg_int(rng) % 180) - 90.0;
        let longitude = f64::from(nonneg_int(rng) % 360) - 180.0;
        cities.push(CityRecord {
            country: String::new(),
            name: String::new(),
            latitude,
            longitude,
        });
    }
    debug!(records = n, "synthesized random cities");
    Dataset { cities }
}

fn nonneg_int<R: RngCore + ?Sized>(rng: &mut R) -> u32 {
    rng.next_u32() >> 1
}

//! CSV persistence for price tables.
//!
//! Layout: `{destination_dir}/{TICKER}_stock_data.csv`
//!
//! - Header row, `Date` first as `YYYY-MM-DD`
//! - `AnalystTargetPrice` repeated on every row when the series carries one
//! - Atomic writes (write to .tmp, rename into place), so a failed save never
//!   leaves a half-written file
//! - Existing files are overwritten

use crate::domain::{EnrichedSeries, PriceBar, PriceSeries};
use crate::error::PipelineError;
use crate::report::Reporter;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const FILE_SUFFIX: &str = "_stock_data.csv";

const PRICE_COLUMNS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];
const TARGET_COLUMN: &str = "AnalystTargetPrice";
const INDICATOR_COLUMNS: [&str; 4] = ["MA5", "MA20", "Daily_Return", "Volatility"];

/// A table that can be written as one CSV file.
pub trait CsvTable {
    /// Column names, in file order.
    fn header(&self) -> Vec<&'static str>;

    /// One record per row, each the same width as `header()`.
    fn records(&self) -> Vec<Vec<String>>;
}

fn price_header(with_target: bool) -> Vec<&'static str> {
    let mut header = PRICE_COLUMNS.to_vec();
    if with_target {
        header.push(TARGET_COLUMN);
    }
    header
}

fn price_record(bar: &PriceBar, target: Option<f64>) -> Vec<String> {
    let mut record = vec![
        bar.date.format("%Y-%m-%d").to_string(),
        bar.open.to_string(),
        bar.high.to_string(),
        bar.low.to_string(),
        bar.close.to_string(),
        bar.volume.to_string(),
    ];
    if let Some(t) = target {
        record.push(t.to_string());
    }
    record
}

impl CsvTable for PriceSeries {
    fn header(&self) -> Vec<&'static str> {
        price_header(self.analyst_target_price.is_some())
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.bars
            .iter()
            .map(|b| price_record(b, self.analyst_target_price))
            .collect()
    }
}

impl CsvTable for EnrichedSeries {
    fn header(&self) -> Vec<&'static str> {
        let mut header = price_header(self.analyst_target_price.is_some());
        header.extend(INDICATOR_COLUMNS);
        header
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.bars
            .iter()
            .map(|row| {
                let mut record = price_record(&row.bar, self.analyst_target_price);
                record.extend([
                    row.ma5.to_string(),
                    row.ma20.to_string(),
                    row.daily_return.to_string(),
                    row.volatility.to_string(),
                ]);
                record
            })
            .collect()
    }
}

/// Writes and reads ticker tables under one destination directory.
pub struct Persister<'a> {
    destination_dir: PathBuf,
    reporter: &'a dyn Reporter,
}

impl<'a> Persister<'a> {
    pub fn new(destination_dir: impl Into<PathBuf>, reporter: &'a dyn Reporter) -> Self {
        Self {
            destination_dir: destination_dir.into(),
            reporter,
        }
    }

    /// Path of the file for a ticker: `{destination_dir}/{ticker}_stock_data.csv`
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.destination_dir.join(format!("{ticker}{FILE_SUFFIX}"))
    }

    /// Write `table` for `ticker`, replacing any previous file.
    ///
    /// Creates the destination directory (and parents) if needed. Returns the
    /// path written.
    pub fn save<T: CsvTable + ?Sized>(
        &self,
        table: &T,
        ticker: &str,
    ) -> Result<PathBuf, PipelineError> {
        let path = self.path_for(ticker);
        match self.write_atomic(table, &path) {
            Ok(()) => {
                self.reporter
                    .info(&format!("Data saved to {}", path.display()));
                Ok(path)
            }
            Err(source) => {
                let err = PipelineError::persistence(&path, source);
                self.reporter.error(&format!("Error saving data: {err}"));
                Err(err)
            }
        }
    }

    /// Read back the raw price columns previously saved for `ticker`.
    pub fn load(&self, ticker: &str) -> Result<PriceSeries, PipelineError> {
        let path = self.path_for(ticker);
        let mut series = read_series(&path)?;
        series.ticker = ticker.to_string();
        Ok(series)
    }

    fn write_atomic<T: CsvTable + ?Sized>(&self, table: &T, path: &Path) -> io::Result<()> {
        fs::create_dir_all(&self.destination_dir)?;

        let tmp_path = path.with_extension("csv.tmp");
        if let Err(e) = write_csv(table, &tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            e
        })
    }
}

fn write_csv<T: CsvTable + ?Sized>(table: &T, path: &Path) -> io::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.header())?;
    for record in table.records() {
        wtr.write_record(&record)?;
    }
    wtr.flush()
}

/// Parse a saved file into a `PriceSeries`.
///
/// Indicator columns, if present, are ignored. The ticker is taken from the
/// file name. I/O failures are `Persistence`; missing columns and unparseable
/// cells are `Processing`.
pub fn read_series(path: &Path) -> Result<PriceSeries, PipelineError> {
    let file = fs::File::open(path).map_err(|e| PipelineError::persistence(path, e))?;
    let mut rdr = csv::Reader::from_reader(file);
    let csv_err = |e: csv::Error| {
        if e.is_io_error() {
            PipelineError::persistence(path, io::Error::from(e))
        } else {
            PipelineError::Processing(format!("{}: {e}", path.display()))
        }
    };

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let column = |name: &str| -> Result<usize, PipelineError> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            PipelineError::Processing(format!("{}: missing column {name}", path.display()))
        })
    };
    let [date_ix, open_ix, high_ix, low_ix, close_ix, volume_ix] = [
        column("Date")?,
        column("Open")?,
        column("High")?,
        column("Low")?,
        column("Close")?,
        column("Volume")?,
    ];
    let target_ix = headers.iter().position(|h| h == TARGET_COLUMN);

    let mut bars = Vec::new();
    let mut target = None;
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let line = i + 2;
        let cell = |ix: usize| record.get(ix).unwrap_or("").trim();
        let number = |ix: usize| -> Result<f64, PipelineError> {
            cell(ix).parse::<f64>().map_err(|_| {
                PipelineError::Processing(format!(
                    "{} line {line}: {} is not numeric ({:?})",
                    path.display(),
                    &headers[ix],
                    cell(ix)
                ))
            })
        };

        bars.push(PriceBar {
            date: parse_date(cell(date_ix)).ok_or_else(|| {
                PipelineError::Processing(format!(
                    "{} line {line}: bad date {:?}",
                    path.display(),
                    cell(date_ix)
                ))
            })?,
            open: number(open_ix)?,
            high: number(high_ix)?,
            low: number(low_ix)?,
            close: number(close_ix)?,
            volume: parse_volume(cell(volume_ix)).ok_or_else(|| {
                PipelineError::Processing(format!(
                    "{} line {line}: Volume is not a count ({:?})",
                    path.display(),
                    cell(volume_ix)
                ))
            })?,
        });

        if target.is_none() {
            if let Some(ix) = target_ix {
                target = cell(ix).parse::<f64>().ok().filter(|t| t.is_finite() && *t != 0.0);
            }
        }
    }

    Ok(PriceSeries::new(ticker_from_path(path), bars).with_analyst_target(target))
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_volume(s: &str) -> Option<u64> {
    s.parse::<u64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64)
    })
}

fn ticker_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(FILE_SUFFIX) {
        Some(ticker) => ticker.to_string(),
        None => name.trim_end_matches(".csv").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnrichedBar;
    use crate::report::{Level, MemoryReporter};

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            open: close - 0.5,
            high: close + 1.25,
            low: close - 1.0,
            close,
            volume: 12_345,
        }
    }

    fn sample() -> PriceSeries {
        PriceSeries::new("AAPL", vec![bar(1, 185.5), bar(2, 186.0), bar(5, 187.125)])
    }

    #[test]
    fn raw_header_without_target() {
        assert_eq!(sample().header(), PRICE_COLUMNS.to_vec());
    }

    #[test]
    fn target_is_broadcast_to_every_row() {
        let series = sample().with_analyst_target(Some(230.0));
        assert_eq!(series.header().last(), Some(&"AnalystTargetPrice"));
        for record in series.records() {
            assert_eq!(record.len(), 7);
            assert_eq!(record[6], "230");
        }
    }

    #[test]
    fn enriched_header_appends_indicators() {
        let series = EnrichedSeries {
            ticker: "AAPL".into(),
            bars: vec![EnrichedBar {
                bar: bar(1, 10.0),
                ma5: 9.0,
                ma20: 8.0,
                daily_return: 0.01,
                volatility: 0.02,
            }],
            analyst_target_price: Some(12.0),
        };
        assert_eq!(
            series.header(),
            vec![
                "Date", "Open", "High", "Low", "Close", "Volume", "AnalystTargetPrice", "MA5",
                "MA20", "Daily_Return", "Volatility"
            ]
        );
        assert_eq!(
            series.records()[0],
            vec!["2024-02-01", "9.5", "11.25", "9", "10", "12345", "12", "9", "8", "0.01", "0.02"]
        );
    }

    #[test]
    fn save_creates_missing_parents_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a/b/stock_data");
        let reporter = MemoryReporter::new();
        let persister = Persister::new(&dest, &reporter);

        let path = persister.save(&sample(), "AAPL").unwrap();

        assert_eq!(path, dest.join("AAPL_stock_data.csv"));
        assert!(path.exists());
        assert!(!dest.join("AAPL_stock_data.csv.tmp").exists());
        assert!(reporter.has(Level::Info, "Data saved to"));
        assert!(reporter.has(Level::Info, "AAPL_stock_data.csv"));
    }

    #[test]
    fn save_writes_expected_text() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = MemoryReporter::new();
        let path = Persister::new(dir.path(), &reporter)
            .save(&PriceSeries::new("X", vec![bar(1, 10.0)]), "X")
            .unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "Date,Open,High,Low,Close,Volume\n2024-02-01,9.5,11.25,9,10,12345\n"
        );
    }

    #[test]
    fn save_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = MemoryReporter::new();
        let persister = Persister::new(dir.path(), &reporter);

        persister.save(&sample(), "AAPL").unwrap();
        let path = persister
            .save(&PriceSeries::new("AAPL", vec![bar(9, 1.0)]), "AAPL")
            .unwrap();

        let loaded = read_series(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.bars[0].close, 1.0);
    }

    #[test]
    fn empty_series_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = MemoryReporter::new();
        let path = Persister::new(dir.path(), &reporter)
            .save(&PriceSeries::new("DEAD", Vec::new()), "DEAD")
            .unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "Date,Open,High,Low,Close,Volume\n"
        );
    }

    #[test]
    fn unwritable_destination_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let reporter = MemoryReporter::new();

        let err = Persister::new(blocker.join("sub"), &reporter)
            .save(&sample(), "AAPL")
            .unwrap_err();

        assert!(matches!(err, PipelineError::Persistence { .. }));
        assert!(reporter.has(Level::Error, "Error saving data"));
    }

    #[test]
    fn load_round_trips_values_and_target() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = MemoryReporter::new();
        let persister = Persister::new(dir.path(), &reporter);
        let original = sample().with_analyst_target(Some(231.75));

        persister.save(&original, "AAPL").unwrap();
        let loaded = persister.load("AAPL").unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn read_ignores_indicator_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MSFT_stock_data.csv");
        fs::write(
            &path,
            "Date,Open,High,Low,Close,Volume,MA5,MA20,Daily_Return,Volatility\n\
             2024-02-01,1,2,0.5,1.5,10,1,1,0.1,0.2\n",
        )
        .unwrap();
        let series = read_series(&path).unwrap();
        assert_eq!(series.ticker, "MSFT");
        assert_eq!(series.closes(), vec![1.5]);
        assert_eq!(series.analyst_target_price, None);
    }

    #[test]
    fn read_accepts_timestamped_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("T_stock_data.csv");
        fs::write(
            &path,
            "Date,Open,High,Low,Close,Volume\n2024-02-01 00:00:00-05:00,1,2,0.5,1.5,10.0\n",
        )
        .unwrap();
        let series = read_series(&path).unwrap();
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(series.bars[0].volume, 10);
    }

    #[test]
    fn missing_close_column_is_processing_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X_stock_data.csv");
        fs::write(&path, "Date,Open,High,Low,Volume\n2024-02-01,1,2,0.5,10\n").unwrap();
        let err = read_series(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Processing(ref m) if m.contains("Close")));
    }

    #[test]
    fn non_numeric_cell_is_processing_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X_stock_data.csv");
        fs::write(
            &path,
            "Date,Open,High,Low,Close,Volume\n2024-02-01,1,2,0.5,abc,10\n",
        )
        .unwrap();
        let err = read_series(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Processing(ref m) if m.contains("line 2")));
    }

    #[test]
    fn missing_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = MemoryReporter::new();
        let err = Persister::new(dir.path(), &reporter).load("NOPE").unwrap_err();
        assert!(matches!(err, PipelineError::Persistence { .. }));
    }
}

//! CSV Data Loader Module
//! Loads the RFM and transaction exports using Polars and normalizes their
//! shape before anything downstream sees them.

use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::schema::{self, RfmColumns};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to load CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("Failed to read input file: {0}")]
    Io(#[from] std::io::Error),
}

/// The two input tables plus the RFM column capabilities resolved at load
/// time. Immutable after construction; aggregates only derive new views.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub rfm: DataFrame,
    pub transactions: DataFrame,
    pub columns: RfmColumns,
}

/// Load both input files, all-or-nothing.
///
/// Any failure (missing file, parse error, column mismatch) surfaces as a
/// single [`LoadError`]; no partial result is returned.
pub fn load_tables(rfm_path: &str, transactions_path: &str) -> Result<LoadedTables, LoadError> {
    let rfm = load_rfm(rfm_path)?;
    let transactions = load_transactions(transactions_path)?;
    let columns = RfmColumns::resolve(&rfm);
    debug!(?columns, "resolved RFM column capabilities");

    Ok(LoadedTables {
        rfm,
        transactions,
        columns,
    })
}

fn read_csv(path: &str) -> Result<DataFrame, LoadError> {
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10_000))
        .finish()?
        .collect()?;
    Ok(df)
}

/// Load the RFM table and resolve the customer-id column.
///
/// Upstream regenerations of this file may or may not have serialized the
/// row index as a named column, so two forms are tolerated: an unlabeled
/// first column is renamed to `CustomerID`, and if no such column exists at
/// all the positional row index is materialized as one.
fn load_rfm(path: &str) -> Result<DataFrame, LoadError> {
    let mut df = read_csv(path)?;

    if let Some(first) = df.get_column_names().first().map(|s| s.to_string()) {
        if schema::INDEX_SENTINELS.contains(&first.as_str()) {
            df.rename(&first, schema::COL_CUSTOMER_ID.into())?;
        }
    }

    if !schema::has_column(&df, schema::COL_CUSTOMER_ID) {
        df = df.with_row_index(schema::COL_CUSTOMER_ID.into(), None)?;
    }

    // CustomerID is expected to be unique per row.
    if let Ok(ids) = df.column(schema::COL_CUSTOMER_ID) {
        if ids.n_unique()? < df.height() {
            warn!(path, "duplicate CustomerID values in RFM table");
        }
    }

    info!(rows = df.height(), path, "loaded RFM table");
    Ok(df)
}

/// Load the transaction table, parsing `InvoiceDate` strictly.
///
/// A single malformed date fails the whole load; there is no per-row skip.
fn load_transactions(path: &str) -> Result<DataFrame, LoadError> {
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10_000))
        .finish()?
        .with_columns([col(schema::COL_INVOICE_DATE).str().strptime(
            DataType::Datetime(TimeUnit::Microseconds, None),
            StrptimeOptions::default(),
            lit("raise"),
        )])
        .collect()?;

    info!(rows = df.height(), path, "loaded transaction table");
    Ok(df)
}

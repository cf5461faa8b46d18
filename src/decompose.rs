//! Table decomposition and recomposition.
//!
//! Decompose flattens a table collection into named typed arrays, one per
//! column, with ragged columns contributing a data half and an `_offset`
//! half. Recompose is the exact inverse, and is where structural damage in a
//! container surfaces: missing arrays, wrong dtypes, inconsistent lengths and
//! broken offset arrays are all `StructuralMismatch`, while a collection that
//! reassembles cleanly but fails the validity check is `CorruptData`.

use std::collections::BTreeMap;

use crate::error::TszipError;
use crate::tables::{Ragged, TableCollection, TreeSequence};
use crate::types::{ColumnData, DType};

/// Named raw arrays plus per-table row counts. Every column of every table is
/// present, zero-length arrays included, so an empty table is representable.
pub struct Decomposed {
    pub arrays: BTreeMap<String, ColumnData>,
    pub row_counts: BTreeMap<String, u64>,
}

//==================================================================================
// 1. Decomposition
//==================================================================================

pub fn decompose(tables: &TableCollection) -> Decomposed {
    let mut arrays = BTreeMap::new();
    let mut row_counts = BTreeMap::new();

    let ind = &tables.individuals;
    row_counts.insert("individuals".to_string(), ind.num_rows() as u64);
    insert(&mut arrays, "individuals/flags", ColumnData::UInt32(ind.flags.clone()));
    insert_ragged_f64(&mut arrays, "individuals/location", &ind.location);
    insert_ragged_i32(&mut arrays, "individuals/parents", &ind.parents);
    insert_ragged_u8(&mut arrays, "individuals/metadata", &ind.metadata);

    let nodes = &tables.nodes;
    row_counts.insert("nodes".to_string(), nodes.num_rows() as u64);
    insert(&mut arrays, "nodes/flags", ColumnData::UInt32(nodes.flags.clone()));
    insert(&mut arrays, "nodes/time", ColumnData::Float64(nodes.time.clone()));
    insert(&mut arrays, "nodes/population", ColumnData::Int32(nodes.population.clone()));
    insert(&mut arrays, "nodes/individual", ColumnData::Int32(nodes.individual.clone()));
    insert_ragged_u8(&mut arrays, "nodes/metadata", &nodes.metadata);

    let edges = &tables.edges;
    row_counts.insert("edges".to_string(), edges.num_rows() as u64);
    insert(&mut arrays, "edges/left", ColumnData::Float64(edges.left.clone()));
    insert(&mut arrays, "edges/right", ColumnData::Float64(edges.right.clone()));
    insert(&mut arrays, "edges/parent", ColumnData::Int32(edges.parent.clone()));
    insert(&mut arrays, "edges/child", ColumnData::Int32(edges.child.clone()));
    insert_ragged_u8(&mut arrays, "edges/metadata", &edges.metadata);

    let mig = &tables.migrations;
    row_counts.insert("migrations".to_string(), mig.num_rows() as u64);
    insert(&mut arrays, "migrations/left", ColumnData::Float64(mig.left.clone()));
    insert(&mut arrays, "migrations/right", ColumnData::Float64(mig.right.clone()));
    insert(&mut arrays, "migrations/node", ColumnData::Int32(mig.node.clone()));
    insert(&mut arrays, "migrations/source", ColumnData::Int32(mig.source.clone()));
    insert(&mut arrays, "migrations/dest", ColumnData::Int32(mig.dest.clone()));
    insert(&mut arrays, "migrations/time", ColumnData::Float64(mig.time.clone()));
    insert_ragged_u8(&mut arrays, "migrations/metadata", &mig.metadata);

    let sites = &tables.sites;
    row_counts.insert("sites".to_string(), sites.num_rows() as u64);
    insert(&mut arrays, "sites/position", ColumnData::Float64(sites.position.clone()));
    insert_ragged_u8(&mut arrays, "sites/ancestral_state", &sites.ancestral_state);
    insert_ragged_u8(&mut arrays, "sites/metadata", &sites.metadata);

    let muts = &tables.mutations;
    row_counts.insert("mutations".to_string(), muts.num_rows() as u64);
    insert(&mut arrays, "mutations/site", ColumnData::Int32(muts.site.clone()));
    insert(&mut arrays, "mutations/node", ColumnData::Int32(muts.node.clone()));
    insert(&mut arrays, "mutations/parent", ColumnData::Int32(muts.parent.clone()));
    insert(&mut arrays, "mutations/time", ColumnData::Float64(muts.time.clone()));
    insert_ragged_u8(&mut arrays, "mutations/derived_state", &muts.derived_state);
    insert_ragged_u8(&mut arrays, "mutations/metadata", &muts.metadata);

    let pops = &tables.populations;
    row_counts.insert("populations".to_string(), pops.num_rows() as u64);
    insert_ragged_u8(&mut arrays, "populations/metadata", &pops.metadata);

    let prov = &tables.provenances;
    row_counts.insert("provenances".to_string(), prov.num_rows() as u64);
    insert_ragged_u8(&mut arrays, "provenances/timestamp", &prov.timestamp);
    insert_ragged_u8(&mut arrays, "provenances/record", &prov.record);

    Decomposed { arrays, row_counts }
}

fn insert(arrays: &mut BTreeMap<String, ColumnData>, name: &str, column: ColumnData) {
    arrays.insert(name.to_string(), column);
}

fn insert_ragged_f64(arrays: &mut BTreeMap<String, ColumnData>, name: &str, ragged: &Ragged<f64>) {
    insert(arrays, name, ColumnData::Float64(ragged.data.clone()));
    insert(arrays, &format!("{name}_offset"), ColumnData::UInt64(ragged.offsets.clone()));
}

fn insert_ragged_i32(arrays: &mut BTreeMap<String, ColumnData>, name: &str, ragged: &Ragged<i32>) {
    insert(arrays, name, ColumnData::Int32(ragged.data.clone()));
    insert(arrays, &format!("{name}_offset"), ColumnData::UInt64(ragged.offsets.clone()));
}

fn insert_ragged_u8(arrays: &mut BTreeMap<String, ColumnData>, name: &str, ragged: &Ragged<u8>) {
    insert(arrays, name, ColumnData::UInt8(ragged.data.clone()));
    insert(arrays, &format!("{name}_offset"), ColumnData::UInt64(ragged.offsets.clone()));
}

//==================================================================================
// 2. Recomposition
//==================================================================================

/// Rebuilds a validated tree sequence from named arrays and row counts.
pub fn recompose(
    mut decomposed: Decomposed,
    sequence_length: f64,
) -> Result<TreeSequence, TszipError> {
    let mut tables = TableCollection::new(sequence_length);

    let rows = row_count(&decomposed.row_counts, "individuals")?;
    tables.individuals.flags = take_u32(&mut decomposed, "individuals/flags", rows)?;
    tables.individuals.location = take_ragged_f64(&mut decomposed, "individuals/location", rows)?;
    tables.individuals.parents = take_ragged_i32(&mut decomposed, "individuals/parents", rows)?;
    tables.individuals.metadata = take_ragged_u8(&mut decomposed, "individuals/metadata", rows)?;

    let rows = row_count(&decomposed.row_counts, "nodes")?;
    tables.nodes.flags = take_u32(&mut decomposed, "nodes/flags", rows)?;
    tables.nodes.time = take_f64(&mut decomposed, "nodes/time", rows)?;
    tables.nodes.population = take_i32(&mut decomposed, "nodes/population", rows)?;
    tables.nodes.individual = take_i32(&mut decomposed, "nodes/individual", rows)?;
    tables.nodes.metadata = take_ragged_u8(&mut decomposed, "nodes/metadata", rows)?;

    let rows = row_count(&decomposed.row_counts, "edges")?;
    tables.edges.left = take_f64(&mut decomposed, "edges/left", rows)?;
    tables.edges.right = take_f64(&mut decomposed, "edges/right", rows)?;
    tables.edges.parent = take_i32(&mut decomposed, "edges/parent", rows)?;
    tables.edges.child = take_i32(&mut decomposed, "edges/child", rows)?;
    tables.edges.metadata = take_ragged_u8(&mut decomposed, "edges/metadata", rows)?;

    let rows = row_count(&decomposed.row_counts, "migrations")?;
    tables.migrations.left = take_f64(&mut decomposed, "migrations/left", rows)?;
    tables.migrations.right = take_f64(&mut decomposed, "migrations/right", rows)?;
    tables.migrations.node = take_i32(&mut decomposed, "migrations/node", rows)?;
    tables.migrations.source = take_i32(&mut decomposed, "migrations/source", rows)?;
    tables.migrations.dest = take_i32(&mut decomposed, "migrations/dest", rows)?;
    tables.migrations.time = take_f64(&mut decomposed, "migrations/time", rows)?;
    tables.migrations.metadata = take_ragged_u8(&mut decomposed, "migrations/metadata", rows)?;

    let rows = row_count(&decomposed.row_counts, "sites")?;
    tables.sites.position = take_f64(&mut decomposed, "sites/position", rows)?;
    tables.sites.ancestral_state = take_ragged_u8(&mut decomposed, "sites/ancestral_state", rows)?;
    tables.sites.metadata = take_ragged_u8(&mut decomposed, "sites/metadata", rows)?;

    let rows = row_count(&decomposed.row_counts, "mutations")?;
    tables.mutations.site = take_i32(&mut decomposed, "mutations/site", rows)?;
    tables.mutations.node = take_i32(&mut decomposed, "mutations/node", rows)?;
    tables.mutations.parent = take_i32(&mut decomposed, "mutations/parent", rows)?;
    tables.mutations.time = take_f64(&mut decomposed, "mutations/time", rows)?;
    tables.mutations.derived_state =
        take_ragged_u8(&mut decomposed, "mutations/derived_state", rows)?;
    tables.mutations.metadata = take_ragged_u8(&mut decomposed, "mutations/metadata", rows)?;

    let rows = row_count(&decomposed.row_counts, "populations")?;
    tables.populations.metadata = take_ragged_u8(&mut decomposed, "populations/metadata", rows)?;

    let rows = row_count(&decomposed.row_counts, "provenances")?;
    tables.provenances.timestamp = take_ragged_u8(&mut decomposed, "provenances/timestamp", rows)?;
    tables.provenances.record = take_ragged_u8(&mut decomposed, "provenances/record", rows)?;

    TreeSequence::new(tables)
}

fn row_count(row_counts: &BTreeMap<String, u64>, table: &str) -> Result<usize, TszipError> {
    row_counts
        .get(table)
        .map(|&n| n as usize)
        .ok_or_else(|| TszipError::StructuralMismatch(format!("Missing row count for {table}")))
}

fn take_array(decomposed: &mut Decomposed, name: &str) -> Result<ColumnData, TszipError> {
    decomposed
        .arrays
        .remove(name)
        .ok_or_else(|| TszipError::StructuralMismatch(format!("Missing required array {name}")))
}

fn check_len(name: &str, actual: usize, expected: usize) -> Result<(), TszipError> {
    if actual != expected {
        return Err(TszipError::StructuralMismatch(format!(
            "Array {name} has {actual} values, expected {expected}"
        )));
    }
    Ok(())
}

fn dtype_mismatch(name: &str, expected: DType, found: DType) -> TszipError {
    TszipError::StructuralMismatch(format!(
        "Array {name} has dtype {found}, expected {expected}"
    ))
}

macro_rules! take_typed {
    ($fn_name:ident, $variant:ident, $dtype:expr, $elem:ty) => {
        fn $fn_name(
            decomposed: &mut Decomposed,
            name: &str,
            expected_len: usize,
        ) -> Result<Vec<$elem>, TszipError> {
            match take_array(decomposed, name)? {
                ColumnData::$variant(values) => {
                    check_len(name, values.len(), expected_len)?;
                    Ok(values)
                }
                other => Err(dtype_mismatch(name, $dtype, other.dtype())),
            }
        }
    };
}

take_typed!(take_f64, Float64, DType::Float64, f64);
take_typed!(take_i32, Int32, DType::Int32, i32);
take_typed!(take_u32, UInt32, DType::UInt32, u32);
take_typed!(take_u64, UInt64, DType::UInt64, u64);
take_typed!(take_u8, UInt8, DType::UInt8, u8);

fn take_offsets(
    decomposed: &mut Decomposed,
    name: &str,
    num_rows: usize,
) -> Result<Vec<u64>, TszipError> {
    let offset_name = format!("{name}_offset");
    let offsets = take_u64(decomposed, &offset_name, num_rows + 1)?;
    if offsets.first() != Some(&0) {
        return Err(TszipError::StructuralMismatch(format!(
            "Offset array {offset_name} does not start at zero"
        )));
    }
    if offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err(TszipError::StructuralMismatch(format!(
            "Offset array {offset_name} is decreasing"
        )));
    }
    Ok(offsets)
}

macro_rules! take_ragged {
    ($fn_name:ident, $take_data:ident, $elem:ty) => {
        fn $fn_name(
            decomposed: &mut Decomposed,
            name: &str,
            num_rows: usize,
        ) -> Result<Ragged<$elem>, TszipError> {
            let offsets = take_offsets(decomposed, name, num_rows)?;
            let data_len = *offsets.last().unwrap_or(&0) as usize;
            let data = $take_data(decomposed, name, data_len)?;
            Ok(Ragged { data, offsets })
        }
    };
}

take_ragged!(take_ragged_f64, take_f64, f64);
take_ragged!(take_ragged_i32, take_i32, i32);
take_ragged!(take_ragged_u8, take_u8, u8);

//==================================================================================
// 3. Unit Tests
//==================================================================================

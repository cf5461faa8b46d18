//! Tree-sequence tables: the typed-columnar data model the compressor
//! consumes and produces.
//!
//! Mirrors the standard tree-sequence table collection: eight tables of
//! equal-length typed columns, with variable-length payloads (metadata,
//! allele strings, provenance JSON) held as ragged columns. The collection
//! carries its own structural-validity check; the compressor treats it purely
//! as a column source/sink and re-runs the check after reconstruction.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TszipError;

/// Null id marker for optional references (no population, no parent).
pub const NULL: i32 = -1;

//==================================================================================
// 1. Ragged Columns
//==================================================================================

/// A variable-length column: one flat data buffer plus a row-offset array.
/// `offsets` has `num_rows + 1` entries, starts at zero, is non-decreasing,
/// and ends at `data.len()`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Ragged<T> {
    pub data: Vec<T>,
    pub offsets: Vec<u64>,
}

impl<T> Default for Ragged<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            offsets: vec![0],
        }
    }
}

impl<T: Clone> Ragged<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_rows(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn push_row(&mut self, row: &[T]) {
        self.data.extend_from_slice(row);
        self.offsets.push(self.data.len() as u64);
    }

    pub fn row(&self, index: usize) -> &[T] {
        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        &self.data[start..end]
    }

    fn check(&self, table: &str, column: &str, num_rows: usize) -> Result<(), TszipError> {
        if self.offsets.len() != num_rows + 1 {
            return Err(TszipError::CorruptData(format!(
                "{table}/{column}: offset array has {} entries, expected {}",
                self.offsets.len(),
                num_rows + 1
            )));
        }
        if self.offsets[0] != 0 {
            return Err(TszipError::CorruptData(format!(
                "{table}/{column}: offset array does not start at zero"
            )));
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(TszipError::CorruptData(format!(
                "{table}/{column}: offset array is decreasing"
            )));
        }
        if *self.offsets.last().unwrap_or(&0) != self.data.len() as u64 {
            return Err(TszipError::CorruptData(format!(
                "{table}/{column}: final offset does not match data length"
            )));
        }
        Ok(())
    }
}

//==================================================================================
// 2. Tables
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct IndividualTable {
    pub flags: Vec<u32>,
    pub location: Ragged<f64>,
    pub parents: Ragged<i32>,
    pub metadata: Ragged<u8>,
}

impl IndividualTable {
    pub fn num_rows(&self) -> usize {
        self.flags.len()
    }

    pub fn add_row(&mut self, flags: u32, location: &[f64], parents: &[i32], metadata: &[u8]) {
        self.flags.push(flags);
        self.location.push_row(location);
        self.parents.push_row(parents);
        self.metadata.push_row(metadata);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NodeTable {
    pub flags: Vec<u32>,
    pub time: Vec<f64>,
    pub population: Vec<i32>,
    pub individual: Vec<i32>,
    pub metadata: Ragged<u8>,
}

impl NodeTable {
    pub fn num_rows(&self) -> usize {
        self.flags.len()
    }

    pub fn add_row(&mut self, flags: u32, time: f64, population: i32, individual: i32, metadata: &[u8]) {
        self.flags.push(flags);
        self.time.push(time);
        self.population.push(population);
        self.individual.push(individual);
        self.metadata.push_row(metadata);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct EdgeTable {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    pub parent: Vec<i32>,
    pub child: Vec<i32>,
    pub metadata: Ragged<u8>,
}

impl EdgeTable {
    pub fn num_rows(&self) -> usize {
        self.left.len()
    }

    pub fn add_row(&mut self, left: f64, right: f64, parent: i32, child: i32, metadata: &[u8]) {
        self.left.push(left);
        self.right.push(right);
        self.parent.push(parent);
        self.child.push(child);
        self.metadata.push_row(metadata);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MigrationTable {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    pub node: Vec<i32>,
    pub source: Vec<i32>,
    pub dest: Vec<i32>,
    pub time: Vec<f64>,
    pub metadata: Ragged<u8>,
}

impl MigrationTable {
    pub fn num_rows(&self) -> usize {
        self.left.len()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_row(
        &mut self,
        left: f64,
        right: f64,
        node: i32,
        source: i32,
        dest: i32,
        time: f64,
        metadata: &[u8],
    ) {
        self.left.push(left);
        self.right.push(right);
        self.node.push(node);
        self.source.push(source);
        self.dest.push(dest);
        self.time.push(time);
        self.metadata.push_row(metadata);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SiteTable {
    pub position: Vec<f64>,
    pub ancestral_state: Ragged<u8>,
    pub metadata: Ragged<u8>,
}

impl SiteTable {
    pub fn num_rows(&self) -> usize {
        self.position.len()
    }

    pub fn add_row(&mut self, position: f64, ancestral_state: &[u8], metadata: &[u8]) {
        self.position.push(position);
        self.ancestral_state.push_row(ancestral_state);
        self.metadata.push_row(metadata);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MutationTable {
    pub site: Vec<i32>,
    pub node: Vec<i32>,
    pub parent: Vec<i32>,
    pub time: Vec<f64>,
    pub derived_state: Ragged<u8>,
    pub metadata: Ragged<u8>,
}

impl MutationTable {
    pub fn num_rows(&self) -> usize {
        self.site.len()
    }

    pub fn add_row(
        &mut self,
        site: i32,
        node: i32,
        parent: i32,
        time: f64,
        derived_state: &[u8],
        metadata: &[u8],
    ) {
        self.site.push(site);
        self.node.push(node);
        self.parent.push(parent);
        self.time.push(time);
        self.derived_state.push_row(derived_state);
        self.metadata.push_row(metadata);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PopulationTable {
    pub metadata: Ragged<u8>,
}

impl PopulationTable {
    pub fn num_rows(&self) -> usize {
        self.metadata.num_rows()
    }

    pub fn add_row(&mut self, metadata: &[u8]) {
        self.metadata.push_row(metadata);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ProvenanceTable {
    pub timestamp: Ragged<u8>,
    pub record: Ragged<u8>,
}

impl ProvenanceTable {
    pub fn num_rows(&self) -> usize {
        self.timestamp.num_rows()
    }

    pub fn add_row(&mut self, timestamp: &[u8], record: &[u8]) {
        self.timestamp.push_row(timestamp);
        self.record.push_row(record);
    }
}

//==================================================================================
// 3. TableCollection
//==================================================================================

/// The full set of tables plus the top-level sequence length.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TableCollection {
    pub sequence_length: f64,
    pub individuals: IndividualTable,
    pub nodes: NodeTable,
    pub edges: EdgeTable,
    pub migrations: MigrationTable,
    pub sites: SiteTable,
    pub mutations: MutationTable,
    pub populations: PopulationTable,
    pub provenances: ProvenanceTable,
}

impl TableCollection {
    pub fn new(sequence_length: f64) -> Self {
        Self {
            sequence_length,
            ..Default::default()
        }
    }

    /// Structural-validity check: column lengths and offset arrays are
    /// consistent, and every cross-table id reference is in range. Failures
    /// are `CorruptData`.
    pub fn validate(&self) -> Result<(), TszipError> {
        self.check_lengths()?;
        self.check_references()
    }

    fn check_lengths(&self) -> Result<(), TszipError> {
        let ind = &self.individuals;
        let n = ind.num_rows();
        ind.location.check("individuals", "location", n)?;
        ind.parents.check("individuals", "parents", n)?;
        ind.metadata.check("individuals", "metadata", n)?;

        let nodes = &self.nodes;
        let n = nodes.num_rows();
        if nodes.time.len() != n || nodes.population.len() != n || nodes.individual.len() != n {
            return Err(TszipError::CorruptData(
                "nodes: column lengths differ".to_string(),
            ));
        }
        nodes.metadata.check("nodes", "metadata", n)?;

        let edges = &self.edges;
        let n = edges.num_rows();
        if edges.right.len() != n || edges.parent.len() != n || edges.child.len() != n {
            return Err(TszipError::CorruptData(
                "edges: column lengths differ".to_string(),
            ));
        }
        edges.metadata.check("edges", "metadata", n)?;

        let mig = &self.migrations;
        let n = mig.num_rows();
        if mig.right.len() != n
            || mig.node.len() != n
            || mig.source.len() != n
            || mig.dest.len() != n
            || mig.time.len() != n
        {
            return Err(TszipError::CorruptData(
                "migrations: column lengths differ".to_string(),
            ));
        }
        mig.metadata.check("migrations", "metadata", n)?;

        let sites = &self.sites;
        let n = sites.num_rows();
        sites.ancestral_state.check("sites", "ancestral_state", n)?;
        sites.metadata.check("sites", "metadata", n)?;

        let muts = &self.mutations;
        let n = muts.num_rows();
        if muts.node.len() != n || muts.parent.len() != n || muts.time.len() != n {
            return Err(TszipError::CorruptData(
                "mutations: column lengths differ".to_string(),
            ));
        }
        muts.derived_state.check("mutations", "derived_state", n)?;
        muts.metadata.check("mutations", "metadata", n)?;

        self.populations
            .metadata
            .check("populations", "metadata", self.populations.num_rows())?;

        let prov = &self.provenances;
        let n = prov.num_rows();
        prov.timestamp.check("provenances", "timestamp", n)?;
        prov.record.check("provenances", "record", n)?;
        Ok(())
    }

    fn check_references(&self) -> Result<(), TszipError> {
        let num_nodes = self.nodes.num_rows() as i32;
        let num_individuals = self.individuals.num_rows() as i32;
        let num_populations = self.populations.num_rows() as i32;
        let num_sites = self.sites.num_rows() as i32;
        let num_mutations = self.mutations.num_rows() as i32;

        let optional = |id: i32, count: i32| id == NULL || (0..count).contains(&id);
        let required = |id: i32, count: i32| (0..count).contains(&id);

        for &parent in &self.individuals.parents.data {
            if !optional(parent, num_individuals) {
                return Err(TszipError::CorruptData(format!(
                    "individuals: parent id {parent} out of range"
                )));
            }
        }
        for (row, (&population, &individual)) in self
            .nodes
            .population
            .iter()
            .zip(&self.nodes.individual)
            .enumerate()
        {
            if !optional(population, num_populations) {
                return Err(TszipError::CorruptData(format!(
                    "nodes: row {row} references population {population}"
                )));
            }
            if !optional(individual, num_individuals) {
                return Err(TszipError::CorruptData(format!(
                    "nodes: row {row} references individual {individual}"
                )));
            }
        }
        for (row, (&parent, &child)) in self.edges.parent.iter().zip(&self.edges.child).enumerate()
        {
            if !required(parent, num_nodes) || !required(child, num_nodes) {
                return Err(TszipError::CorruptData(format!(
                    "edges: row {row} references node out of range"
                )));
            }
            let (left, right) = (self.edges.left[row], self.edges.right[row]);
            if !(left < right && left >= 0.0 && right <= self.sequence_length) {
                return Err(TszipError::CorruptData(format!(
                    "edges: row {row} interval [{left}, {right}) invalid"
                )));
            }
        }
        for (row, &node) in self.migrations.node.iter().enumerate() {
            if !required(node, num_nodes)
                || !required(self.migrations.source[row], num_populations)
                || !required(self.migrations.dest[row], num_populations)
            {
                return Err(TszipError::CorruptData(format!(
                    "migrations: row {row} references id out of range"
                )));
            }
        }
        for (row, window) in self.sites.position.windows(2).enumerate() {
            if window[0] >= window[1] {
                return Err(TszipError::CorruptData(format!(
                    "sites: positions not strictly increasing at row {}",
                    row + 1
                )));
            }
        }
        for (row, &position) in self.sites.position.iter().enumerate() {
            if !(position >= 0.0 && position < self.sequence_length) {
                return Err(TszipError::CorruptData(format!(
                    "sites: row {row} position {position} outside [0, {})",
                    self.sequence_length
                )));
            }
        }
        for (row, &site) in self.mutations.site.iter().enumerate() {
            if !required(site, num_sites)
                || !required(self.mutations.node[row], num_nodes)
                || !optional(self.mutations.parent[row], num_mutations)
            {
                return Err(TszipError::CorruptData(format!(
                    "mutations: row {row} references id out of range"
                )));
            }
        }
        Ok(())
    }
}

//==================================================================================
// 4. TreeSequence
//==================================================================================

/// A validated table collection. Construction runs the structural check, so
/// holding a `TreeSequence` is proof the tables passed it.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSequence {
    tables: TableCollection,
}

impl TreeSequence {
    pub fn new(tables: TableCollection) -> Result<Self, TszipError> {
        tables.validate()?;
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &TableCollection {
        &self.tables
    }

    pub fn into_tables(self) -> TableCollection {
        self.tables
    }

    /// Serializes the tables to the plain (uncompressed) MessagePack format.
    pub fn dump<W: Write>(&self, writer: &mut W) -> Result<(), TszipError> {
        rmp_serde::encode::write(writer, &self.tables)
            .map_err(|e| TszipError::InternalError(format!("Table serialization failed: {e}")))
    }

    pub fn dump_path(&self, path: &Path) -> Result<(), TszipError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.dump(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads the plain MessagePack format and validates the result.
    pub fn load<R: Read>(reader: R) -> Result<Self, TszipError> {
        let tables: TableCollection = rmp_serde::decode::from_read(reader).map_err(|e| {
            TszipError::FileFormatError(format!("not a tree-sequence dump: {e}"))
        })?;
        Self::new(tables)
    }

    pub fn load_path(path: &Path) -> Result<Self, TszipError> {
        Self::load(BufReader::new(File::open(path)?))
    }
}

//==================================================================================
// 5. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_collection() -> TableCollection {
        let mut tables = TableCollection::new(100.0);
        tables.populations.add_row(b"{}");
        tables.nodes.add_row(1, 0.0, 0, NULL, &[]);
        tables.nodes.add_row(0, 1.5, 0, NULL, &[]);
        tables.edges.add_row(0.0, 100.0, 1, 0, &[]);
        tables
    }

    #[test]
    fn test_valid_collection_passes() {
        two_node_collection().validate().unwrap();
    }

    #[test]
    fn test_empty_collection_passes() {
        TableCollection::new(0.0).validate().unwrap();
    }

    #[test]
    fn test_edge_node_out_of_range() {
        let mut tables = two_node_collection();
        tables.edges.add_row(0.0, 50.0, 7, 0, &[]);
        assert!(matches!(
            tables.validate(),
            Err(TszipError::CorruptData(_))
        ));
    }

    #[test]
    fn test_edge_interval_past_sequence_length() {
        let mut tables = two_node_collection();
        tables.edges.add_row(0.0, 200.0, 1, 0, &[]);
        assert!(matches!(
            tables.validate(),
            Err(TszipError::CorruptData(_))
        ));
    }

    #[test]
    fn test_unsorted_sites_rejected() {
        let mut tables = two_node_collection();
        tables.sites.add_row(50.0, b"A", &[]);
        tables.sites.add_row(10.0, b"T", &[]);
        assert!(matches!(
            tables.validate(),
            Err(TszipError::CorruptData(_))
        ));
    }

    #[test]
    fn test_broken_offsets_rejected() {
        let mut tables = two_node_collection();
        tables.nodes.metadata.offsets[1] = 99;
        assert!(matches!(
            tables.validate(),
            Err(TszipError::CorruptData(_))
        ));
    }

    #[test]
    fn test_ragged_rows() {
        let mut ragged: Ragged<u8> = Ragged::new();
        ragged.push_row(b"abc");
        ragged.push_row(b"");
        ragged.push_row(b"de");
        assert_eq!(ragged.num_rows(), 3);
        assert_eq!(ragged.row(0), b"abc");
        assert_eq!(ragged.row(1), b"");
        assert_eq!(ragged.row(2), b"de");
    }

    #[test]
    fn test_dump_load_roundtrip() {
        let ts = TreeSequence::new(two_node_collection()).unwrap();
        let mut buf = Vec::new();
        ts.dump(&mut buf).unwrap();
        let back = TreeSequence::load(buf.as_slice()).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_load_garbage_is_file_format_error() {
        let result = TreeSequence::load(&b"not messagepack at all"[..]);
        assert!(matches!(result, Err(TszipError::FileFormatError(_))));
    }
}

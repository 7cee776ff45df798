//! Nodal field access by stable integer handles.
use eyre::eyre;
use nalgebra::DMatrix;
use rustc_hash::FxHashMap;

/// Stable identifier of a registered field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldHandle(pub usize);

/// Time level of a field with history.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldState {
    /// The unknown time level `n + 1`.
    Np1,
    N,
    Nm1,
}

impl FieldState {
    /// Name under which the given state of a field is registered.
    pub fn field_name(&self, base_name: &str) -> String {
        match self {
            Self::Np1 => base_name.to_string(),
            Self::N => format!("{base_name}_n"),
            Self::Nm1 => format!("{base_name}_nm1"),
        }
    }
}

/// Read access to nodal fields.
pub trait FieldStore: Sync {
    fn field_handle(&self, name: &str) -> Option<FieldHandle>;

    fn num_components(&self, handle: FieldHandle) -> usize;

    fn num_nodes(&self) -> usize;

    /// Gathers the values of the given nodes into a `num_components x nodes.len()` matrix.
    fn gather_nodal(&self, handle: FieldHandle, nodes: &[usize], output: &mut DMatrix<f64>) -> eyre::Result<()>;

    /// Like [`FieldStore::field_handle`], but failing for unknown names.
    fn require_field(&self, name: &str) -> eyre::Result<FieldHandle> {
        self.field_handle(name)
            .ok_or_else(|| eyre!("Field \"{name}\" is not registered"))
    }
}

#[derive(Debug, Clone)]
struct NodalField {
    name: String,
    values: DMatrix<f64>,
}

/// In-memory store of nodal fields, each held as a `num_components x num_nodes` matrix.
#[derive(Debug, Clone, Default)]
pub struct NodalFieldStore {
    num_nodes: usize,
    handles: FxHashMap<String, FieldHandle>,
    fields: Vec<NodalField>,
}

impl NodalFieldStore {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            ..Self::default()
        }
    }

    /// Registers a zero-initialized field, or returns the handle of an existing field with
    /// the same name and component count.
    pub fn register(&mut self, name: &str, num_components: usize) -> eyre::Result<FieldHandle> {
        if let Some(&handle) = self.handles.get(name) {
            let existing = self.fields[handle.0].values.nrows();
            if existing != num_components {
                return Err(eyre!(
                    "Field \"{name}\" already registered with {existing} component(s), requested {num_components}"
                ));
            }
            return Ok(handle);
        }
        let handle = FieldHandle(self.fields.len());
        self.fields.push(NodalField {
            name: name.to_string(),
            values: DMatrix::zeros(num_components, self.num_nodes),
        });
        self.handles.insert(name.to_string(), handle);
        Ok(handle)
    }

    pub fn register_with_values(&mut self, name: &str, values: DMatrix<f64>) -> eyre::Result<FieldHandle> {
        if values.ncols() != self.num_nodes {
            return Err(eyre!(
                "Field \"{name}\" has values for {} node(s), store has {}",
                values.ncols(),
                self.num_nodes
            ));
        }
        let handle = self.register(name, values.nrows())?;
        self.fields[handle.0].values = values;
        Ok(handle)
    }

    /// Registers a field with values given by a function of the node coordinates.
    pub fn register_from_fn(
        &mut self,
        name: &str,
        num_components: usize,
        coordinates: &DMatrix<f64>,
        f: impl Fn(&[f64]) -> Vec<f64>,
    ) -> eyre::Result<FieldHandle> {
        let mut values = DMatrix::zeros(num_components, coordinates.ncols());
        for (node, x) in coordinates.column_iter().enumerate() {
            let x: Vec<f64> = x.iter().copied().collect();
            let value = f(&x);
            if value.len() != num_components {
                return Err(eyre!("Field \"{name}\" expects {num_components} component(s), got {}", value.len()));
            }
            values.column_mut(node).copy_from_slice(&value);
        }
        self.register_with_values(name, values)
    }

    pub fn name(&self, handle: FieldHandle) -> &str {
        &self.fields[handle.0].name
    }

    pub fn values(&self, handle: FieldHandle) -> &DMatrix<f64> {
        &self.fields[handle.0].values
    }

    pub fn values_mut(&mut self, handle: FieldHandle) -> &mut DMatrix<f64> {
        &mut self.fields[handle.0].values
    }
}

impl FieldStore for NodalFieldStore {
    fn field_handle(&self, name: &str) -> Option<FieldHandle> {
        self.handles.get(name).copied()
    }

    fn num_components(&self, handle: FieldHandle) -> usize {
        self.fields[handle.0].values.nrows()
    }

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn gather_nodal(&self, handle: FieldHandle, nodes: &[usize], output: &mut DMatrix<f64>) -> eyre::Result<()> {
        let field = self
            .fields
            .get(handle.0)
            .ok_or_else(|| eyre!("Unknown field handle {}", handle.0))?;
        output.resize_mut(field.values.nrows(), nodes.len(), 0.0);
        for (local, &global) in nodes.iter().enumerate() {
            if global >= self.num_nodes {
                return Err(eyre!("Node {global} out of bounds for field \"{}\"", field.name));
            }
            output.column_mut(local).copy_from(&field.values.column(global));
        }
        Ok(())
    }
}

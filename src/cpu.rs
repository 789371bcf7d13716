// CPU pool for schedsim
use crate::process::ProcessId;

/// CPU number, starting at 1
pub type CpuId = usize;

/// A CPU slot holding at most one running process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpu {
    id: CpuId,
    owner: Option<ProcessId>,
}

impl Cpu {
    pub fn new(id: CpuId) -> Self {
        Self { id, owner: None }
    }

    pub fn id(&self) -> CpuId {
        self.id
    }

    /// Process currently running on this CPU
    pub fn owner(&self) -> Option<ProcessId> {
        self.owner
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }
}

/// Fixed-size set of CPUs. Ownership changes only go through
/// `acquire` and `release`.
#[derive(Debug, Clone)]
pub struct CpuPool {
    cpus: Vec<Cpu>,
}

impl CpuPool {
    pub fn new(count: usize) -> Self {
        Self {
            cpus: (1..=count).map(Cpu::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }

    pub fn in_use_count(&self) -> usize {
        self.cpus.iter().filter(|cpu| !cpu.is_free()).count()
    }

    pub fn free_count(&self) -> usize {
        self.len() - self.in_use_count()
    }

    /// True when every CPU is held (never true for an empty pool)
    pub fn is_saturated(&self) -> bool {
        !self.is_empty() && self.free_count() == 0
    }

    pub fn get(&self, id: CpuId) -> Option<&Cpu> {
        self.cpus.iter().find(|cpu| cpu.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cpu> {
        self.cpus.iter()
    }

    /// CPU owned by `pid`, if any
    pub fn held_by(&self, pid: ProcessId) -> Option<CpuId> {
        self.cpus
            .iter()
            .find(|cpu| cpu.owner == Some(pid))
            .map(|cpu| cpu.id)
    }

    /// Hand the lowest-numbered free CPU to `pid`
    pub(crate) fn acquire(&mut self, pid: ProcessId) -> Option<CpuId> {
        let cpu = self.cpus.iter_mut().find(|cpu| cpu.is_free())?;
        cpu.owner = Some(pid);
        Some(cpu.id)
    }

    /// Free `id` if `pid` owns it. Returns whether anything changed.
    pub(crate) fn release(&mut self, id: CpuId, pid: ProcessId) -> bool {
        match self.cpus.iter_mut().find(|cpu| cpu.id == id) {
            Some(cpu) if cpu.owner == Some(pid) => {
                cpu.owner = None;
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_owner(&mut self, id: CpuId, owner: Option<ProcessId>) {
        if let Some(cpu) = self.cpus.iter_mut().find(|cpu| cpu.id == id) {
            cpu.owner = owner;
        }
    }
}

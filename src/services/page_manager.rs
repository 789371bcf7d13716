// Page residency service for schedsim
use core::fmt;

use crate::process::ProcessId;

/// Page identifier, starting at 1
pub type PageId = usize;

/// Residency of a page.
///
/// The two `Transitional` states are the only ones a click can change;
/// the settled states move only when the owning process starts or stops
/// using the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Resident,                // In use, in RAM
    Swapped,                 // Not in use, in swap
    Transitional(Transition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SwapIn,  // In use but still in swap
    SwapOut, // Not in use, still in RAM
}

impl PageState {
    pub fn in_use(self) -> bool {
        matches!(
            self,
            PageState::Resident | PageState::Transitional(Transition::SwapIn)
        )
    }

    pub fn in_swap(self) -> bool {
        matches!(
            self,
            PageState::Swapped | PageState::Transitional(Transition::SwapIn)
        )
    }

    fn from_flags(in_use: bool, in_swap: bool) -> Self {
        match (in_use, in_swap) {
            (true, false) => PageState::Resident,
            (false, true) => PageState::Swapped,
            (true, true) => PageState::Transitional(Transition::SwapIn),
            (false, false) => PageState::Transitional(Transition::SwapOut),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    id: PageId,
    owner: ProcessId,
    state: PageState,
}

impl Page {
    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn in_use(&self) -> bool {
        self.state.in_use()
    }

    pub fn in_swap(&self) -> bool {
        self.state.in_swap()
    }

    pub fn is_resident(&self) -> bool {
        self.state == PageState::Resident
    }
}

/// Page errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    PageNotFound,
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PageError::PageNotFound => write!(f, "Page not found"),
        }
    }
}

impl std::error::Error for PageError {}

/// Page Manager - owns every page and applies the residency rules
#[derive(Debug, Clone, Default)]
pub struct PageManager {
    pages: Vec<Page>,
}

impl PageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `owner` a fresh page. It starts in RAM and unused.
    pub fn allocate(&mut self, owner: ProcessId) -> PageId {
        let id = self.pages.len() + 1;
        self.pages.push(Page {
            id,
            owner,
            state: PageState::Transitional(Transition::SwapOut),
        });
        id
    }

    pub fn get(&self, id: PageId) -> Option<&Page> {
        id.checked_sub(1).and_then(|index| self.pages.get(index))
    }

    fn get_mut(&mut self, id: PageId) -> Result<&mut Page, PageError> {
        id.checked_sub(1)
            .and_then(|index| self.pages.get_mut(index))
            .ok_or(PageError::PageNotFound)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn is_resident(&self, id: PageId) -> bool {
        self.get(id).is_some_and(Page::is_resident)
    }

    /// User click: completes a pending swap-in or swap-out, leaves settled
    /// pages untouched. Returns the resulting state.
    pub fn on_click(&mut self, id: PageId) -> Result<PageState, PageError> {
        let page = self.get_mut(id)?;
        let next = match page.state {
            PageState::Transitional(Transition::SwapIn) => PageState::Resident,
            PageState::Transitional(Transition::SwapOut) => PageState::Swapped,
            settled => settled,
        };
        if next != page.state {
            log::debug!("[page] Page {} {:?} -> {:?}", id, page.state, next);
            page.state = next;
        }
        Ok(next)
    }

    /// Click every transitional page. Returns how many changed.
    pub fn resolve_transitional(&mut self) -> usize {
        let transitional: Vec<PageId> = self
            .pages
            .iter()
            .filter(|page| matches!(page.state, PageState::Transitional(_)))
            .map(|page| page.id)
            .collect();
        for &id in &transitional {
            // Ids come from our own list
            let _ = self.on_click(id);
        }
        transitional.len()
    }

    /// The owner started running and wants its page
    pub(crate) fn claim(&mut self, id: PageId) -> Result<PageState, PageError> {
        let page = self.get_mut(id)?;
        page.state = PageState::from_flags(true, page.state.in_swap());
        Ok(page.state)
    }

    /// The owner stopped running
    pub(crate) fn release(&mut self, id: PageId) -> Result<PageState, PageError> {
        let page = self.get_mut(id)?;
        page.state = PageState::from_flags(false, page.state.in_swap());
        Ok(page.state)
    }

    pub fn resident_count(&self) -> usize {
        self.pages.iter().filter(|page| page.is_resident()).count()
    }

    pub fn swapped_count(&self) -> usize {
        self.pages.iter().filter(|page| page.in_swap()).count()
    }

    #[cfg(test)]
    fn with_state(state: PageState) -> (Self, PageId) {
        let mut manager = Self::new();
        let id = manager.allocate(1);
        manager.pages[0].state = state;
        (manager, id)
    }
}

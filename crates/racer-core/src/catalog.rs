//! Immutable lookup tables built once from the startup snapshot.

use std::collections::HashMap;

use crate::error::AppError;
use crate::types::{ReservableSlot, SnapshotData, Ticket};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    slots: HashMap<i64, ReservableSlot>,
    tickets: HashMap<String, Ticket>,
}

impl Catalog {
    /// Index every slot and ticket in the snapshot. A slot id listed under
    /// more than one date keeps its last occurrence.
    pub fn from_snapshot(data: &SnapshotData) -> Self {
        let slots = data
            .reserve_list
            .slots()
            .map(|slot| (slot.id, slot.clone()))
            .collect();
        let tickets = data
            .user_ticket_info
            .iter()
            .map(|ticket| (ticket.id.clone(), ticket.clone()))
            .collect();
        Self { slots, tickets }
    }

    pub fn slot(&self, id: i64) -> Option<&ReservableSlot> {
        self.slots.get(&id)
    }

    pub fn ticket(&self, id: &str) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    /// Look up both halves of a job pair.
    pub fn pair(
        &self,
        slot_id: i64,
        ticket_id: &str,
    ) -> Result<(&ReservableSlot, &Ticket), AppError> {
        let slot = self.slot(slot_id).ok_or(AppError::SlotNotFound(slot_id))?;
        let ticket = self
            .ticket(ticket_id)
            .ok_or_else(|| AppError::TicketNotFound(ticket_id.to_string()))?;
        Ok((slot, ticket))
    }

    /// Tickets sorted by id, for stable startup logging.
    pub fn tickets(&self) -> Vec<&Ticket> {
        let mut tickets: Vec<_> = self.tickets.values().collect();
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        tickets
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

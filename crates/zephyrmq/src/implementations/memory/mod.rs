//! In-process driver backed by a single [`std::sync::Mutex`]-guarded state
//! tree. Exists purely so the storage-contract test suite (pagination,
//! claim races, TTL extension) runs without a live Postgres instance —
//! grounded in the teacher's own `storage-in-memory` test split, generalized
//! from a single catalog store to the five capability traits this crate
//! groups into [`crate::service::Driver`] and [`crate::service::ProxyDriver`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::service::{
    catalogue::{CatalogueEntry, CatalogueOps, ListCatalogueQuery},
    claim::{extend_ttl, ClaimMeta, ClaimOps, CreateClaimRequest},
    ids::{ClaimId, ClientUuid, MsgId, ProjectId, QueueName},
    message::{ListMessagesQuery, Message, MessageOps, MessageSpec},
    pagination::{Marker, Page},
    partition::{weighted_pick, Partition, PartitionOps},
    queue::{ListQueuesQuery, Metadata, QueueOps, QueueRecord, QueueStats},
    MessageStat, Result, SharedClock, ZephyrError,
};

type QueueKey = (ProjectId, QueueName);

#[derive(Debug, Clone)]
struct QueueRow {
    metadata: Metadata,
}

#[derive(Debug, Clone)]
struct MessageRow {
    id: MsgId,
    project: ProjectId,
    queue: QueueName,
    body: serde_json::Value,
    ttl_seconds: u64,
    created_at: DateTime<Utc>,
    client_uuid: ClientUuid,
    claim_id: Option<ClaimId>,
    claim_expires_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.created_at + chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    fn is_live_claimed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.claim_expires_at, Some(expires_at) if expires_at > now) && self.claim_id.is_some()
    }

    fn to_message(&self, now: DateTime<Utc>) -> Message {
        Message {
            id: self.id,
            queue: self.queue.clone(),
            body: self.body.clone(),
            ttl_seconds: self.ttl_seconds,
            created_at: self.created_at,
            client_uuid: Some(self.client_uuid.clone()),
            claim_id: if self.is_live_claimed(now) {
                self.claim_id
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone)]
struct ClaimRow {
    project: ProjectId,
    queue: QueueName,
    ttl_seconds: u64,
    grace_seconds: u64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CatalogueRow {
    location: String,
    metadata: Metadata,
}

#[derive(Debug, Clone)]
struct PartitionRow {
    weight: u32,
    nodes: Vec<String>,
    rotating_index: u64,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<QueueKey, QueueRow>,
    messages: Vec<MessageRow>,
    claims: HashMap<ClaimId, ClaimRow>,
    catalogue: HashMap<QueueKey, CatalogueRow>,
    partitions: HashMap<String, PartitionRow>,
}

/// An in-memory [`crate::service::Driver`] + [`crate::service::ProxyDriver`].
#[derive(Clone)]
pub struct MemoryDriver {
    state: Arc<Mutex<State>>,
    clock: SharedClock,
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver").finish_non_exhaustive()
    }
}

impl MemoryDriver {
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }
}

#[async_trait]
impl QueueOps for MemoryDriver {
    async fn create(&self, project: &ProjectId, name: &QueueName) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let key = (project.clone(), name.clone());
        if state.queues.contains_key(&key) {
            return Ok(false);
        }
        state.queues.insert(
            key,
            QueueRow {
                metadata: Metadata::new(),
            },
        );
        Ok(true)
    }

    async fn exists(&self, project: &ProjectId, name: &QueueName) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.queues.contains_key(&(project.clone(), name.clone())))
    }

    async fn get_metadata(&self, project: &ProjectId, name: &QueueName) -> Result<Metadata> {
        let state = self.state.lock().unwrap();
        state
            .queues
            .get(&(project.clone(), name.clone()))
            .map(|row| row.metadata.clone())
            .ok_or_else(|| ZephyrError::QueueDoesNotExist {
                project: project.to_string(),
                queue: name.to_string(),
            })
    }

    async fn set_metadata(
        &self,
        project: &ProjectId,
        name: &QueueName,
        metadata: Metadata,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .queues
            .get_mut(&(project.clone(), name.clone()))
            .ok_or_else(|| ZephyrError::QueueDoesNotExist {
                project: project.to_string(),
                queue: name.to_string(),
            })?;
        row.metadata = metadata;
        Ok(())
    }

    async fn delete(&self, project: &ProjectId, name: &QueueName) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let key = (project.clone(), name.clone());
        state.queues.remove(&key);
        state
            .messages
            .retain(|m| !(m.project == *project && m.queue == *name));
        state
            .claims
            .retain(|_, c| !(c.project == *project && c.queue == *name));
        state.catalogue.remove(&key);
        Ok(())
    }

    async fn list(&self, project: &ProjectId, query: ListQueuesQuery) -> Result<Page<QueueRecord>> {
        let state = self.state.lock().unwrap();
        let marker = query
            .marker
            .as_ref()
            .and_then(|m| Marker::decode_queue_name(m.as_str()));
        if query.marker.is_some() && marker.is_none() {
            return Ok(Page::empty());
        }

        let mut names: Vec<&QueueName> = state
            .queues
            .keys()
            .filter(|(p, _)| p == project)
            .map(|(_, n)| n)
            .filter(|n| marker.as_deref().is_none_or(|m| n.as_str() > m))
            .collect();
        names.sort();

        let has_more = names.len() > query.limit;
        let items: Vec<QueueRecord> = names
            .into_iter()
            .take(query.limit)
            .map(|name| QueueRecord {
                name: name.clone(),
                metadata: query.detailed.then(|| {
                    state.queues[&(project.clone(), name.clone())]
                        .metadata
                        .clone()
                }),
            })
            .collect();

        let next_marker = has_more
            .then(|| items.last().map(|r| Marker::for_queue_name(r.name.as_str())))
            .flatten();
        Ok(Page { items, next_marker })
    }

    async fn stats(&self, project: &ProjectId, name: &QueueName) -> Result<QueueStats> {
        let now = self.clock.now();
        let state = self.state.lock().unwrap();
        let live: Vec<&MessageRow> = state
            .messages
            .iter()
            .filter(|m| m.project == *project && m.queue == *name && !m.is_expired(now))
            .collect();

        let free = live.iter().filter(|m| !m.is_live_claimed(now)).count() as u64;
        let claimed = live.iter().filter(|m| m.is_live_claimed(now)).count() as u64;

        let oldest = live
            .iter()
            .min_by_key(|m| (m.created_at, m.id))
            .map(|m| MessageStat {
                id: m.id.to_string(),
                created: m.created_at,
            });
        let newest = live
            .iter()
            .max_by_key(|m| (m.created_at, m.id))
            .map(|m| MessageStat {
                id: m.id.to_string(),
                created: m.created_at,
            });

        Ok(QueueStats {
            free,
            claimed,
            total: live.len() as u64,
            oldest,
            newest,
        })
    }
}

#[async_trait]
impl MessageOps for MemoryDriver {
    async fn post(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        client_uuid: &ClientUuid,
        specs: Vec<MessageSpec>,
    ) -> Result<Vec<MsgId>> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let mut ids = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = MsgId::generate();
            state.messages.push(MessageRow {
                id,
                project: project.clone(),
                queue: queue.clone(),
                body: spec.body,
                ttl_seconds: spec.ttl_seconds,
                created_at: now,
                client_uuid: client_uuid.clone(),
                claim_id: None,
                claim_expires_at: None,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get(&self, project: &ProjectId, queue: &QueueName, msg_id: MsgId) -> Result<Message> {
        let now = self.clock.now();
        let state = self.state.lock().unwrap();
        state
            .messages
            .iter()
            .find(|m| m.project == *project && m.queue == *queue && m.id == msg_id && !m.is_expired(now))
            .map(|m| m.to_message(now))
            .ok_or_else(|| ZephyrError::MessageDoesNotExist {
                queue: queue.to_string(),
                msg_id: msg_id.to_string(),
            })
    }

    async fn bulk_get(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        ids: &[MsgId],
    ) -> Result<Vec<Message>> {
        let now = self.clock.now();
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .messages
                    .iter()
                    .find(|m| m.project == *project && m.queue == *queue && m.id == *id && !m.is_expired(now))
            })
            .map(|m| m.to_message(now))
            .collect())
    }

    async fn delete(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        msg_id: MsgId,
        claim: Option<ClaimId>,
    ) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let Some(pos) = state
            .messages
            .iter()
            .position(|m| m.project == *project && m.queue == *queue && m.id == msg_id)
        else {
            return Ok(());
        };

        let row = &state.messages[pos];
        let live_claim = row.is_live_claimed(now).then_some(row.claim_id).flatten();
        // `spec.md` §3 invariant 3: permitted iff the caller supplies no
        // claim token and the message is unclaimed, or the supplied claim
        // equals the live claim. Any other combination — including a
        // well-formed but stale/wrong claim token against an unclaimed
        // message — is `NotPermitted` (§8 scenario 2).
        if claim != live_claim {
            return Err(ZephyrError::not_permitted(
                "supplied claim does not match this message's current live claim",
            ));
        }

        state.messages.remove(pos);
        Ok(())
    }

    async fn bulk_delete(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        ids: &[MsgId],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .messages
            .retain(|m| !(m.project == *project && m.queue == *queue && ids.contains(&m.id)));
        Ok(())
    }

    async fn list(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        query: ListMessagesQuery,
    ) -> Result<Page<Message>> {
        let now = self.clock.now();
        let state = self.state.lock().unwrap();
        let marker = match &query.marker {
            Some(m) => match Marker::decode_message(m.as_str()) {
                Some(decoded) => Some(decoded),
                None => return Ok(Page::empty()),
            },
            None => None,
        };

        let mut candidates: Vec<&MessageRow> = state
            .messages
            .iter()
            .filter(|m| m.project == *project && m.queue == *queue && !m.is_expired(now))
            .filter(|m| query.include_claimed || !m.is_live_claimed(now))
            .filter(|m| {
                query.echo
                    || query
                        .client_uuid
                        .as_ref()
                        .is_none_or(|want| m.client_uuid != *want)
            })
            .filter(|m| marker.as_ref().is_none_or(|(ts, id)| (m.created_at, m.id) > (*ts, *id)))
            .collect();
        candidates.sort_by_key(|m| (m.created_at, m.id));

        let has_more = candidates.len() > query.limit;
        let items: Vec<Message> = candidates
            .into_iter()
            .take(query.limit)
            .map(|m| m.to_message(now))
            .collect();

        let next_marker = has_more
            .then(|| items.last().map(|m| Marker::for_message(m.created_at, m.id)))
            .flatten();
        Ok(Page { items, next_marker })
    }
}

#[async_trait]
impl ClaimOps for MemoryDriver {
    async fn create(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        request: CreateClaimRequest,
    ) -> Result<(ClaimId, Vec<Message>)> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();

        let mut candidate_positions: Vec<usize> = state
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                m.project == *project && m.queue == *queue && !m.is_expired(now) && !m.is_live_claimed(now)
            })
            .map(|(idx, _)| idx)
            .collect();
        candidate_positions
            .sort_by_key(|&idx| (state.messages[idx].created_at, state.messages[idx].id));
        candidate_positions.truncate(request.limit);

        let claim_id = ClaimId::generate();
        let expires_at = now + chrono::Duration::seconds(request.ttl_seconds as i64);

        let mut claimed = Vec::with_capacity(candidate_positions.len());
        for idx in candidate_positions {
            let row = &mut state.messages[idx];
            let remaining = (row.created_at + chrono::Duration::seconds(row.ttl_seconds as i64) - now)
                .num_seconds()
                .max(0) as u64;
            row.ttl_seconds = extend_ttl(remaining, request.ttl_seconds, request.grace_seconds);
            row.claim_id = Some(claim_id);
            row.claim_expires_at = Some(expires_at);
            claimed.push(row.to_message(now));
        }

        state.claims.insert(
            claim_id,
            ClaimRow {
                project: project.clone(),
                queue: queue.clone(),
                ttl_seconds: request.ttl_seconds,
                grace_seconds: request.grace_seconds,
                created_at: now,
                expires_at,
            },
        );

        Ok((claim_id, claimed))
    }

    async fn get(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        claim_id: ClaimId,
    ) -> Result<(ClaimMeta, Vec<Message>)> {
        let now = self.clock.now();
        let state = self.state.lock().unwrap();
        let row = state
            .claims
            .get(&claim_id)
            .filter(|c| c.project == *project && c.queue == *queue && c.expires_at > now)
            .ok_or_else(|| ZephyrError::ClaimDoesNotExist {
                queue: queue.to_string(),
                claim_id: claim_id.to_string(),
            })?;

        let meta = ClaimMeta {
            id: claim_id,
            ttl_seconds: row.ttl_seconds,
            grace_seconds: row.grace_seconds,
            created_at: row.created_at,
            expires_at: row.expires_at,
        };
        let messages = state
            .messages
            .iter()
            .filter(|m| m.claim_id == Some(claim_id) && m.is_live_claimed(now))
            .map(|m| m.to_message(now))
            .collect();
        Ok((meta, messages))
    }

    async fn update(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        claim_id: ClaimId,
        ttl_seconds: u64,
    ) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let new_expires_at = now + chrono::Duration::seconds(ttl_seconds as i64);

        {
            let row = state
                .claims
                .get_mut(&claim_id)
                .filter(|c| c.project == *project && c.queue == *queue && c.expires_at > now)
                .ok_or_else(|| ZephyrError::ClaimDoesNotExist {
                    queue: queue.to_string(),
                    claim_id: claim_id.to_string(),
                })?;
            row.ttl_seconds = ttl_seconds;
            row.expires_at = new_expires_at;
        }

        for m in state
            .messages
            .iter_mut()
            .filter(|m| m.claim_id == Some(claim_id))
        {
            m.claim_expires_at = Some(new_expires_at);
        }
        Ok(())
    }

    async fn delete(
        &self,
        _project: &ProjectId,
        _queue: &QueueName,
        claim_id: ClaimId,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.claims.remove(&claim_id);
        for m in state
            .messages
            .iter_mut()
            .filter(|m| m.claim_id == Some(claim_id))
        {
            m.claim_id = None;
            m.claim_expires_at = None;
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogueOps for MemoryDriver {
    async fn insert(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        location: &str,
        metadata: Metadata,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let key = (project.clone(), queue.clone());
        if state.catalogue.contains_key(&key) {
            return Err(ZephyrError::EntryAlreadyExists {
                project: project.to_string(),
                queue: queue.to_string(),
            });
        }
        state.catalogue.insert(
            key,
            CatalogueRow {
                location: location.to_string(),
                metadata,
            },
        );
        Ok(())
    }

    async fn get(&self, project: &ProjectId, queue: &QueueName) -> Result<CatalogueEntry> {
        let state = self.state.lock().unwrap();
        state
            .catalogue
            .get(&(project.clone(), queue.clone()))
            .map(|row| CatalogueEntry {
                project: project.clone(),
                queue: queue.clone(),
                location: Some(row.location.clone()),
                metadata: Some(row.metadata.clone()),
            })
            .ok_or_else(|| ZephyrError::EntryNotFound {
                project: project.to_string(),
                queue: queue.to_string(),
            })
    }

    async fn list(
        &self,
        project: &ProjectId,
        query: ListCatalogueQuery,
    ) -> Result<Page<CatalogueEntry>> {
        let state = self.state.lock().unwrap();
        let marker = match &query.marker {
            Some(m) => match Marker::decode_catalogue_key(m.as_str()) {
                Some(decoded) => Some(decoded),
                None => return Ok(Page::empty()),
            },
            None => None,
        };

        let mut queues: Vec<&QueueName> = state
            .catalogue
            .keys()
            .filter(|(p, _)| p == project)
            .map(|(_, q)| q)
            .filter(|q| {
                marker
                    .as_ref()
                    .is_none_or(|(_, marker_queue)| q.as_str() > marker_queue.as_str())
            })
            .collect();
        queues.sort();

        let has_more = queues.len() > query.limit;
        let items: Vec<CatalogueEntry> = queues
            .into_iter()
            .take(query.limit)
            .map(|queue| {
                let row = &state.catalogue[&(project.clone(), queue.clone())];
                CatalogueEntry {
                    project: project.clone(),
                    queue: queue.clone(),
                    location: query.include_location.then(|| row.location.clone()),
                    metadata: query.include_metadata.then(|| row.metadata.clone()),
                }
            })
            .collect();

        let next_marker = has_more
            .then(|| {
                items
                    .last()
                    .map(|e| Marker::for_catalogue_key(project.as_str(), e.queue.as_str()))
            })
            .flatten();
        Ok(Page { items, next_marker })
    }

    async fn delete(&self, project: &ProjectId, queue: &QueueName) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.catalogue.remove(&(project.clone(), queue.clone()));
        Ok(())
    }

    async fn location(&self, project: &ProjectId, queue: &QueueName) -> Result<String> {
        let state = self.state.lock().unwrap();
        state
            .catalogue
            .get(&(project.clone(), queue.clone()))
            .map(|row| row.location.clone())
            .ok_or_else(|| ZephyrError::EntryNotFound {
                project: project.to_string(),
                queue: queue.to_string(),
            })
    }

    async fn update_metadata(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        metadata: Metadata,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .catalogue
            .get_mut(&(project.clone(), queue.clone()))
            .ok_or_else(|| ZephyrError::EntryNotFound {
                project: project.to_string(),
                queue: queue.to_string(),
            })?;
        row.metadata = metadata;
        Ok(())
    }

    async fn r#move(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        new_location: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .catalogue
            .get_mut(&(project.clone(), queue.clone()))
            .ok_or_else(|| ZephyrError::EntryNotFound {
                project: project.to_string(),
                queue: queue.to_string(),
            })?;
        row.location = new_location.to_string();
        Ok(())
    }
}

#[async_trait]
impl PartitionOps for MemoryDriver {
    async fn create(&self, name: &str, weight: u32, nodes: Vec<String>) -> Result<()> {
        if nodes.is_empty() {
            return Err(ZephyrError::validation("partition requires at least one node"));
        }
        let mut state = self.state.lock().unwrap();
        state.partitions.insert(
            name.to_string(),
            PartitionRow {
                weight,
                nodes,
                rotating_index: 0,
            },
        );
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Partition> {
        let state = self.state.lock().unwrap();
        state
            .partitions
            .get(name)
            .map(|row| Partition {
                name: name.to_string(),
                weight: row.weight,
                nodes: row.nodes.clone(),
                rotating_index: row.rotating_index,
            })
            .ok_or_else(|| ZephyrError::PartitionNotFound {
                name: name.to_string(),
            })
    }

    async fn list(&self) -> Result<Vec<Partition>> {
        let state = self.state.lock().unwrap();
        let mut partitions: Vec<Partition> = state
            .partitions
            .iter()
            .map(|(name, row)| Partition {
                name: name.clone(),
                weight: row.weight,
                nodes: row.nodes.clone(),
                rotating_index: row.rotating_index,
            })
            .collect();
        partitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(partitions)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.partitions.remove(name);
        Ok(())
    }

    async fn select(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.partitions.is_empty() {
            return Err(ZephyrError::NoPartitionsRegistered);
        }

        let mut names: Vec<String> = state.partitions.keys().cloned().collect();
        names.sort();
        let weights: Vec<u32> = names.iter().map(|n| state.partitions[n].weight).collect();
        let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
        let draw = if total == 0 { 0 } else { fastrand::u64(0..total) };
        let chosen_idx = weighted_pick(&weights, draw);
        let chosen_name = names[chosen_idx].clone();

        let row = state.partitions.get_mut(&chosen_name).unwrap();
        let node_idx = (row.rotating_index as usize) % row.nodes.len();
        let node = row.nodes[node_idx].clone();
        row.rotating_index += 1;
        Ok(node)
    }
}

//! Typed row access on top of a session
//!
//! An [`Entity`] is a serde type stored as one row of one table, keyed by a
//! single string primary key. A [`MappingManager`] turns a session into
//! [`Mapper`]s, each of which reads and writes one entity type with default
//! options per operation kind.

use mage_core::{Error, MapperOption, Result, Row, Session, StatementOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A type stored as one row of [`Entity::TABLE`]
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Table holding the rows, in the session's keyspace
    const TABLE: &'static str;

    fn primary_key(&self) -> String;

    /// Name used in errors and logs
    fn entity_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Creates mappers bound to one session
#[derive(Clone)]
pub struct MappingManager {
    session: Arc<dyn Session>,
}

impl MappingManager {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// A mapper for `T` without default options.
    ///
    /// Fails with [`Error::UnmappedEntity`] if `T::TABLE` does not exist in the
    /// session's keyspace.
    pub async fn mapper<T: Entity>(&self) -> Result<Mapper<T>> {
        if !self.session.has_table(T::TABLE).await? {
            return Err(Error::unmapped_entity(
                T::entity_name(),
                self.session.keyspace().as_str(),
            ));
        }
        Ok(Mapper {
            session: Arc::clone(&self.session),
            options: MapperOptions::default(),
            _entity: PhantomData,
        })
    }
}

impl fmt::Debug for MappingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingManager")
            .field("keyspace", &self.session.keyspace())
            .finish()
    }
}

/// Default options a mapper applies per operation kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapperOptions {
    pub get: Option<MapperOption>,
    pub save: Option<MapperOption>,
    pub delete: Option<MapperOption>,
}

fn statement(option: Option<MapperOption>) -> StatementOptions {
    option
        .map(|o| o.apply(StatementOptions::default()))
        .unwrap_or_default()
}

/// Reads and writes one entity type through one session
pub struct Mapper<T> {
    session: Arc<dyn Session>,
    options: MapperOptions,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Mapper<T> {
    pub fn with_get_options(mut self, option: MapperOption) -> Self {
        self.options.get = Some(option);
        self
    }

    pub fn with_save_options(mut self, option: MapperOption) -> Self {
        self.options.save = Some(option);
        self
    }

    pub fn with_delete_options(mut self, option: MapperOption) -> Self {
        self.options.delete = Some(option);
        self
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// The entity stored under `key`, or `None`
    pub async fn get(&self, key: &str) -> Result<Option<T>> {
        let row = self
            .session
            .fetch(T::TABLE, key, statement(self.options.get))
            .await?;
        row.map(from_row::<T>).transpose()
    }

    /// Insert or replace `entity`
    pub async fn save(&self, entity: &T) -> Result<()> {
        let row = to_row(entity)?;
        self.session
            .upsert(T::TABLE, &entity.primary_key(), row, statement(self.options.save))
            .await
    }

    /// Delete `entity`, returning whether a row was removed
    pub async fn delete(&self, entity: &T) -> Result<bool> {
        self.delete_by_key(&entity.primary_key()).await
    }

    pub async fn delete_by_key(&self, key: &str) -> Result<bool> {
        self.session
            .remove(T::TABLE, key, statement(self.options.delete))
            .await
    }
}

impl<T> Clone for Mapper<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            options: self.options,
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Mapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("entity", &std::any::type_name::<T>())
            .field("keyspace", &self.session.keyspace())
            .field("options", &self.options)
            .finish()
    }
}

fn to_row<T: Entity>(entity: &T) -> Result<Row> {
    match serde_json::to_value(entity) {
        Ok(serde_json::Value::Object(row)) => Ok(row),
        Ok(other) => Err(Error::mapping(
            T::entity_name(),
            format!("expected a row, serialized to {other}"),
        )),
        Err(e) => Err(Error::mapping(T::entity_name(), e.to_string())),
    }
}

fn from_row<T: Entity>(row: Row) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(row))
        .map_err(|e| Error::mapping(T::entity_name(), e.to_string()))
}

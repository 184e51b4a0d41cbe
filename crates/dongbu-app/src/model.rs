// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;
use crate::schema::{CAR_LOGS, COMMENTS, Entity, STORAGE_ITEMS, TableSpec, format_number};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageItem {
    pub id: StorageItemId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarLog {
    pub id: CarLogId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub car_number: Option<String>,
    #[serde(default)]
    pub odometer: Option<f64>,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

impl Entity for Comment {
    type Id = CommentId;

    const SPEC: &'static TableSpec = &COMMENTS;

    fn id(&self) -> CommentId {
        self.id
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    fn field_text(&self, column: &str) -> String {
        match column {
            "username" => text(&self.username),
            "message" => text(&self.message),
            _ => String::new(),
        }
    }
}

impl Entity for StorageItem {
    type Id = StorageItemId;

    const SPEC: &'static TableSpec = &STORAGE_ITEMS;

    fn id(&self) -> StorageItemId {
        self.id
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    fn field_text(&self, column: &str) -> String {
        match column {
            "name" => text(&self.name),
            "location" => text(&self.location),
            "quantity" => number(self.quantity),
            "memo" => text(&self.memo),
            _ => String::new(),
        }
    }
}

impl Entity for CarLog {
    type Id = CarLogId;

    const SPEC: &'static TableSpec = &CAR_LOGS;

    fn id(&self) -> CarLogId {
        self.id
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    fn field_text(&self, column: &str) -> String {
        match column {
            "car_number" => text(&self.car_number),
            "odometer" => number(self.odometer),
            "driver" => text(&self.driver),
            "route" => text(&self.route),
            "service" => text(&self.service),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Board,
    Storage,
    Car,
    Account,
}

impl TabKind {
    pub const ALL: [Self; 4] = [Self::Board, Self::Storage, Self::Car, Self::Account];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Storage => "storage",
            Self::Car => "car",
            Self::Account => "account",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.label() == value)
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let index = Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Comment,
    StorageItem,
    CarLog,
    Account,
}

impl FormKind {
    pub const fn for_tab(tab: TabKind) -> Self {
        match tab {
            TabKind::Board => Self::Comment,
            TabKind::Storage => Self::StorageItem,
            TabKind::Car => Self::CarLog,
            TabKind::Account => Self::Account,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Form(FormKind),
    Search,
}

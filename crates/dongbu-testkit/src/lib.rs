// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Seeded fake rows for demo mode and tests.

use dongbu_app::{CAR_LOGS, COMMENTS, Draft, Record, STORAGE_ITEMS};
use serde_json::{Value, json};

const NICKNAMES: [&str; 10] = [
    "민지", "서연", "도윤", "하준", "지우", "somi", "jay", "운영팀", "총무", "익명",
];

const MESSAGES: [&str; 12] = [
    "이번 주 회의는 목요일로 변경되었습니다.",
    "창고 정리 도와주실 분 계신가요?",
    "차량 예약은 하루 전까지 부탁드립니다.",
    "새 프린터 토너 들어왔어요.",
    "주차장 2층 공사 중입니다.",
    "Reminder: badge renewal is due Friday.",
    "Lost an umbrella near the lobby.",
    "점심 메뉴 추천 받습니다.",
    "소화기 점검 완료했습니다.",
    "Wi-Fi password changed, ask the front desk.",
    "택배는 1층 보관함에 있어요.",
    "다음 달 워크숍 장소 투표해주세요.",
];

const ITEM_NAMES: [&str; 12] = [
    "A4 용지", "토너", "멀티탭", "행사용 현수막", "Vase", "Folding chair", "Extension cord",
    "소화기", "물티슈", "Projector", "Label printer", "장갑",
];

const LOCATIONS: [&str; 8] = ["A-1", "A-3", "B-1", "B-2", "C-4", "창고 2층", "회의실", "Lobby"];

const MEMOS: [&str; 6] = [
    "유통기한 확인",
    "one is broken",
    "대여 중",
    "reorder when below 5",
    "행사 후 반납",
    "spare cables inside",
];

const DRIVERS: [&str; 8] = ["김민수", "이서준", "박지훈", "최유나", "정하늘", "Kim", "Lee", "Park"];

const ROUTES: [&str; 8] = [
    "본사 - 김포공항",
    "본사 - 인천 물류센터",
    "본사 - 수원 지점",
    "서초 - 판교",
    "HQ - Yeouido",
    "본사 - 세종청사",
    "거래처 방문",
    "HQ - Gangnam",
];

const SERVICES: [&str; 6] = [
    "엔진오일 교환",
    "타이어 공기압 점검",
    "세차",
    "wiper replacement",
    "brake pads",
    "주유",
];

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

pub struct DemoFaker {
    rng: DeterministicRng,
    odometers: Vec<(String, i64)>,
}

impl DemoFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            odometers: Vec::new(),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }

    pub fn comment(&mut self) -> Record {
        let mut record = Record::new();
        record.insert("username", json!(self.pick(&NICKNAMES)));
        record.insert("message", json!(self.pick(&MESSAGES)));
        record
    }

    pub fn storage_item(&mut self) -> Record {
        let mut record = Record::new();
        record.insert("name", json!(self.pick(&ITEM_NAMES)));
        record.insert("location", json!(self.pick(&LOCATIONS)));
        let quantity = if self.rng.chance(80) {
            json!(1 + self.rng.int_n(40))
        } else {
            Value::Null
        };
        record.insert("quantity", quantity);
        let memo = if self.rng.chance(40) {
            json!(self.pick(&MEMOS))
        } else {
            Value::Null
        };
        record.insert("memo", memo);
        record
    }

    /// Trip log for `car`. Odometer readings only grow per car.
    pub fn car_log(&mut self, car: &str) -> Record {
        let distance = 5 + self.rng.int_n(180) as i64;
        let start = 20_000 + self.rng.int_n(60_000) as i64;
        let odometer = match self.odometers.iter_mut().find(|(name, _)| name == car) {
            Some((_, reading)) => {
                *reading += distance;
                *reading
            }
            None => {
                self.odometers.push((car.to_owned(), start));
                start
            }
        };

        let mut record = Record::new();
        record.insert("car_number", json!(car));
        record.insert("odometer", json!(odometer));
        record.insert("driver", json!(self.pick(&DRIVERS)));
        let route = if self.rng.chance(85) {
            json!(self.pick(&ROUTES))
        } else {
            Value::Null
        };
        record.insert("route", route);
        let service = if self.rng.chance(25) {
            json!(self.pick(&SERVICES))
        } else {
            Value::Null
        };
        record.insert("service", service);
        record
    }

    /// A filled-in storage form, as a user would type it.
    pub fn storage_draft(&mut self) -> Draft {
        let mut draft = Draft::blank(&STORAGE_ITEMS);
        draft.set_column("name", self.pick(&ITEM_NAMES));
        draft.set_column("location", self.pick(&LOCATIONS));
        draft.set_column("quantity", (1 + self.rng.int_n(40)).to_string());
        draft
    }

    pub fn comment_draft(&mut self) -> Draft {
        let mut draft = Draft::blank(&COMMENTS);
        draft.set_column("username", self.pick(&NICKNAMES));
        draft.set_column("message", self.pick(&MESSAGES));
        draft
    }

    pub fn car_log_draft(&mut self) -> Draft {
        let mut draft = Draft::blank(&CAR_LOGS);
        draft.set_column("odometer", (20_000 + self.rng.int_n(60_000)).to_string());
        draft.set_column("driver", self.pick(&DRIVERS));
        draft.set_column("route", self.pick(&ROUTES));
        draft
    }
}

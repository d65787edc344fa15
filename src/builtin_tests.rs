//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::*;
use std::ffi::CString;

use adapt::*;
use assoc::*;
use creator::*;
use marshal::*;
use node::{Branch, Config};
use test_helpers::{parse, Tracked};

/// A record holding a single value under tag 1.
struct Field<C : NodeCreator> where C::Value : Sized {
    creator: C,
    value: C::Value,
}

impl<C : NodeCreator> Marshalable for Field<C> where C::Value : Sized {
    fn class_to_tree(&self, dst: &mut Branch) -> Result<()> {
        dst.expect_map_mut()?.write_field(1, &self.creator, &self.value)
    }

    fn tree_to_class(&mut self, src: &Branch) -> Result<()> {
        src.expect_map()?.read_field(1, &self.creator, &mut self.value)
    }
}

macro_rules! tcase {
    ($name:ident ($creator:expr, $input:expr => $binary:expr)) => {
        #[test]
        fn $name() {
            let orig = Field { creator: $creator, value: $input };
            let encoded = to_bytes(&orig).unwrap();
            assert_eq!(&parse($binary)[..], &encoded[..]);

            let mut result = Field { creator: $creator,
                                     value: Default::default() };
            from_bytes(&encoded, &Config::default(), &mut result).unwrap();
            assert_eq!(orig.value, result.value);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Picture { Standard = 0, Vivid = 3 }
marshal_enum!(Picture { Standard, Vivid });

impl Default for Picture {
    fn default() -> Self { Picture::Standard }
}

// Scalars
tcase!(f_false (ScalarCreator::<bool>::new(), false =>
                "10 00 00 00 00 06 04 01 00 00 00 00"));
tcase!(f_true  (ScalarCreator::<bool>::new(), true =>
                "10 00 00 00 00 06 04 01 00 00 00 01"));
tcase!(f_i8    (ScalarCreator::<i8>::new(), -2i8 =>
                "10 00 00 00 00 06 04 01 FF FF FF FE"));
tcase!(f_u8    (ScalarCreator::<u8>::new(), 255u8 =>
                "10 00 00 00 00 06 04 01 00 00 00 FF"));
tcase!(f_u16   (ScalarCreator::<u16>::new(), 300u16 =>
                "10 00 00 00 00 06 04 01 00 00 01 2C"));
tcase!(f_i16   (ScalarCreator::<i16>::new(), -300i16 =>
                "10 00 00 00 00 06 04 01 FF FF FE D4"));
tcase!(f_u32   (ScalarCreator::<u32>::new(), 70u32 =>
                "10 00 00 00 00 06 04 01 00 00 00 46"));
tcase!(f_i32   (ScalarCreator::<i32>::new(), -300i32 =>
                "10 00 00 00 00 06 04 01 FF FF FE D4"));
tcase!(f_u64   (ScalarCreator::<u64>::new(), 300u64 =>
                "10 00 00 00 00 0E 08 01 00 00 00 08
                 00 00 00 00 00 00 01 2C"));
tcase!(f_i64   (ScalarCreator::<i64>::new(), -1i64 =>
                "10 00 00 00 00 0E 08 01 00 00 00 08
                 FF FF FF FF FF FF FF FF"));
tcase!(f_f32   (ScalarCreator::<f32>::new(), 1.5f32 =>
                "10 00 00 00 00 06 04 01 3F C0 00 00"));
tcase!(f_f64   (ScalarCreator::<f64>::new(), -2.0f64 =>
                "10 00 00 00 00 0E 08 01 00 00 00 08
                 C0 00 00 00 00 00 00 00"));
tcase!(f_char  (ScalarCreator::<char>::new(), 'é' =>
                "10 00 00 00 00 06 04 01 00 00 00 E9"));
tcase!(f_enum  (EnumCreator::new(Picture::Standard), Picture::Vivid =>
                "10 00 00 00 00 06 04 01 00 00 00 03"));

// Strings and blobs
tcase!(f_empty_str (StringCreator, String::new() =>
                    "10 00 00 00 00 06 08 01 00 00 00 00"));
tcase!(f_str       (StringCreator, "TV".to_owned() =>
                    "10 00 00 00 00 08 08 01 00 00 00 02 'TV'"));
tcase!(f_empty_wide (WideStringCreator, String::new() =>
                     "10 00 00 00 00 06 08 01 00 00 00 00"));
tcase!(f_wide      (WideStringCreator, "Hi".to_owned() =>
                    "10 00 00 00 00 0E 08 01 00 00 00 08
                     00 00 00 48 00 00 00 69"));
tcase!(f_bytes     (BytesCreator, vec![0u8, 255] =>
                    "10 00 00 00 00 08 08 01 00 00 00 02 00 FF"));
tcase!(f_cstring   (CStringCreator, CString::new("ab").unwrap() =>
                    "10 00 00 00 00 08 08 01 00 00 00 02 'ab'"));

// One-dimensional containers
tcase!(f_vec_u16   (vec_of(ScalarCreator::<u16>::new()), vec![1u16, 2] =>
                    "10 00 00 00 00 10 0C 01 00 00 00 0A
                     08 00 00 00 00 04 00 01 00 02"));
tcase!(f_vec_u16_empty (vec_of(ScalarCreator::<u16>::new()), vec![] =>
                        "10 00 00 00 00 0C 0C 01 00 00 00 06
                         08 00 00 00 00 00"));
tcase!(f_vec_u64   (vec_of(ScalarCreator::<u64>::new()), vec![1u64, 2] =>
                    "10 00 00 00 00 22 0C 01 00 00 00 1C
                     08 00 00 00 00 08 00 00 00 00 00 00 00 01
                     08 00 00 00 00 08 00 00 00 00 00 00 00 02"));
tcase!(f_vec_f64_empty (vec_of(ScalarCreator::<f64>::new()), vec![] =>
                        "10 00 00 00 00 06 0C 01 00 00 00 00"));
tcase!(f_vec_str   (vec_of(StringCreator), vec!["a".to_owned()] =>
                    "10 00 00 00 00 0D 0C 01 00 00 00 07
                     08 00 00 00 00 01 'a'"));
tcase!(f_vec_str_empty (vec_of(StringCreator), vec![] =>
                        "10 00 00 00 00 06 0C 01 00 00 00 00"));
tcase!(f_vec_enum  (vec_of(EnumCreator::new(Picture::Standard)),
                    vec![Picture::Vivid, Picture::Standard] =>
                    "10 00 00 00 00 14 0C 01 00 00 00 0E
                     08 00 00 00 00 08 00 00 00 03 00 00 00 00"));
tcase!(f_set_u8    (set_of(ScalarCreator::<u8>::new()),
                    vec![3u8, 1].into_iter().collect() =>
                    "10 00 00 00 00 0E 0C 01 00 00 00 08
                     08 00 00 00 00 02 01 03"));
tcase!(f_boxed_vec (boxed_vec_of(MarshalableCreator::<Tracked>::new()),
                    vec![Box::new(Tracked::new(1, "x"))] =>
                    "10 00 00 00 00 19 0C 01 00 00 00 13
                     10 00 00 00 00 0D
                     04 00 00 00 00 01
                     08 01 00 00 00 01 'x'"));

// Associative containers
tcase!(f_map       (map_of(ScalarCreator::<u8>::new(),
                           ScalarCreator::<u8>::new()),
                    vec![(1u8, 2u8)].into_iter().collect() =>
                    "10 00 00 00 00 12 0C 01 00 00 00 0C
                     04 00 00 00 00 01 04 01 00 00 00 02"));
tcase!(f_map_empty (map_of(StringCreator, StringCreator), BTreeMap::new() =>
                    "10 00 00 00 00 06 0C 01 00 00 00 00"));
tcase!(f_multimap  (multimap_of(ScalarCreator::<u8>::new(), StringCreator), {
                        let mut m = MultiMap::new();
                        m.insert(7u8, "p".to_owned());
                        m.insert(7u8, "q".to_owned());
                        m
                    } =>
                    "10 00 00 00 00 20 0C 01 00 00 00 1A
                     04 00 00 00 00 07 08 01 00 00 00 01 'p'
                     04 00 00 00 00 07 08 01 00 00 00 01 'q'"));

#[derive(Debug, Default, PartialEq)]
struct Example {
    enabled: bool,
    count: u32,
    name: String,
}

marshal_record!(Example {
    [0] enabled: ScalarCreator::<bool>::new(),
    [1] count: ScalarCreator::<u32>::new(),
    [2] name: WideStringCreator,
});

#[test]
fn example_record_scenario() {
    let orig = Example { enabled: true, count: 70,
                         name: "Example".to_owned() };
    let encoded = to_bytes(&orig).unwrap();
    assert_eq!(&parse("10 00 00 00 00 2E
                       04 00 00 00 00 01
                       04 01 00 00 00 46
                       08 02 00 00 00 1C
                       00 00 00 45 00 00 00 78 00 00 00 61 00 00 00 6D
                       00 00 00 70 00 00 00 6C 00 00 00 65")[..],
               &encoded[..]);

    let mut result = Example::default();
    from_bytes(&encoded, &Config::default(), &mut result).unwrap();
    assert_eq!(orig, result);
}

#[derive(Debug, Default, PartialEq)]
struct Lineup {
    name: String,
    channels: Vec<Example>,
    favourites: BTreeSet<u16>,
    by_source: BTreeMap<String, Vec<u32>>,
}

marshal_record!(Lineup {
    [0] name: StringCreator,
    [1] channels: vec_of(MarshalableCreator::<Example>::new()),
    [2] favourites: set_of(ScalarCreator::<u16>::new()),
    [3] by_source: map_of(StringCreator,
                          vec_of(ScalarCreator::<u32>::new())),
});

#[test]
fn nested_record_round_trip() {
    let mut orig = Lineup::default();
    orig.name = "cable".to_owned();
    orig.channels.push(Example { enabled: true, count: 2,
                                 name: "news".to_owned() });
    orig.channels.push(Example::default());
    orig.favourites.insert(2);
    orig.favourites.insert(40);
    orig.by_source.insert("tuner".to_owned(), vec![1, 2, 3]);
    orig.by_source.insert("hdmi".to_owned(), vec![]);

    let encoded = to_bytes(&orig).unwrap();
    let mut result = Lineup::default();
    from_bytes(&encoded, &Config::default(), &mut result).unwrap();
    assert_eq!(orig, result);

    from_bytes(&encoded, &Config::default(), &mut result).unwrap();
    assert_eq!(orig, result);
}

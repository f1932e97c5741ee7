//! Parser for the `.atlas` text files written by the 3.x texture packer.
//!
//! ```text
//! hero.png
//! size: 256,128
//! format: RGBA8888
//! filter: Linear,Linear
//! repeat: none
//! head
//!   rotate: false
//!   xy: 2, 2
//!   size: 60, 80
//!   orig: 64, 84
//!   offset: 2, 2
//!   index: -1
//! ```
//!
//! Pages are separated by blank lines. Every non-blank line after a page header that is not a
//! `key: value` entry starts a region.

use crate::Error;
use crate::attachment::TextureRegion;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Atlas {
    pub pages: Vec<AtlasPage>,
    /// Regions in file order; sequence frames share a name and differ by `index`.
    pub regions: Vec<AtlasRegion>,
}

impl Atlas {
    pub fn parse(input: &str) -> Result<Self, Error> {
        parse_atlas(input)
    }

    /// First region named `name`.
    pub fn find_region(&self, name: &str) -> Option<&AtlasRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn page(&self, index: usize) -> Option<&AtlasPage> {
        self.pages.get(index)
    }

    /// Texture placement for the first region named `name`, ready to bind to an attachment.
    pub fn texture_region(&self, name: &str) -> Option<TextureRegion> {
        let region = self.find_region(name)?;
        let page = self.page(region.page)?;
        Some(TextureRegion {
            name: region.name.clone(),
            page: page.name.clone(),
            page_width: page.width as f32,
            page_height: page.height as f32,
            u: region.u,
            v: region.v,
            u2: region.u2,
            v2: region.v2,
            degrees: region.degrees,
            width: region.width as f32,
            height: region.height as f32,
            offset_x: region.offset_x as f32,
            offset_y: region.offset_y as f32,
            original_width: region.original_width as f32,
            original_height: region.original_height as f32,
        })
    }
}

impl FromStr for Atlas {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_atlas(s)
    }
}

#[derive(Clone, Debug)]
pub struct AtlasPage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub min_filter: AtlasFilter,
    pub mag_filter: AtlasFilter,
    pub wrap_u: AtlasWrap,
    pub wrap_v: AtlasWrap,
}

impl AtlasPage {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            width: 0,
            height: 0,
            format: "RGBA8888".to_string(),
            min_filter: AtlasFilter::default(),
            mag_filter: AtlasFilter::default(),
            wrap_u: AtlasWrap::default(),
            wrap_v: AtlasWrap::default(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub enum AtlasFilter {
    Nearest,
    #[default]
    Linear,
    MipMap,
    MipMapNearestNearest,
    MipMapNearestLinear,
    MipMapLinearNearest,
    MipMapLinearLinear,
    Other(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AtlasWrap {
    #[default]
    ClampToEdge,
    Repeat,
}

#[derive(Clone, Debug)]
pub struct AtlasRegion {
    pub name: String,
    pub page: usize,
    pub x: u32,
    pub y: u32,
    /// Unrotated size after whitespace stripping.
    pub width: u32,
    pub height: u32,
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
    pub degrees: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub original_width: u32,
    pub original_height: u32,
    /// Sequence frame number, `-1` for a standalone image.
    pub index: i32,
    /// Nine-patch `[left, right, top, bottom]`.
    pub splits: Option<[i32; 4]>,
    pub pads: Option<[i32; 4]>,
}

impl AtlasRegion {
    fn new(name: &str, page: usize) -> Self {
        Self {
            name: name.to_string(),
            page,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            u: 0.0,
            v: 0.0,
            u2: 0.0,
            v2: 0.0,
            degrees: 0,
            offset_x: 0,
            offset_y: 0,
            original_width: 0,
            original_height: 0,
            index: -1,
            splits: None,
            pads: None,
        }
    }

    fn finish(mut self, page: &AtlasPage) -> Result<Self, Error> {
        if self.original_width == 0 {
            self.original_width = self.width;
        }
        if self.original_height == 0 {
            self.original_height = self.height;
        }
        let pw = page.width.max(1) as f32;
        let ph = page.height.max(1) as f32;
        let (packed_w, packed_h) = if self.degrees == 90 || self.degrees == 270 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        self.u = self.x as f32 / pw;
        self.v = self.y as f32 / ph;
        let (Some(right), Some(bottom)) = (
            self.x.checked_add(packed_w),
            self.y.checked_add(packed_h),
        ) else {
            return Err(invalid(
                "region xy",
                &format!("{}, {} (size {packed_w}, {packed_h})", self.x, self.y),
            ));
        };
        self.u2 = right as f32 / pw;
        self.v2 = bottom as f32 / ph;
        Ok(self)
    }
}

fn entry(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

fn parse_atlas(input: &str) -> Result<Atlas, Error> {
    let mut pages: Vec<AtlasPage> = Vec::new();
    let mut regions = Vec::new();
    let mut page_index: Option<usize> = None;

    let mut lines = input.lines().map(str::trim_end).peekable();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            page_index = None;
            continue;
        }

        match page_index {
            None => {
                let mut page = AtlasPage::new(line);
                while let Some((key, value)) = lines.peek().copied().and_then(entry) {
                    lines.next();
                    apply_page_entry(&mut page, key, value)?;
                }
                pages.push(page);
                page_index = Some(pages.len() - 1);
            }
            Some(index) => {
                let mut region = AtlasRegion::new(line, index);
                while let Some((key, value)) = lines.peek().copied().and_then(entry) {
                    lines.next();
                    apply_region_entry(&mut region, key, value)?;
                }
                regions.push(region.finish(&pages[index])?);
            }
        }
    }

    if pages.is_empty() {
        return Err(Error::AtlasParse {
            message: "empty atlas".to_string(),
        });
    }

    Ok(Atlas { pages, regions })
}

fn invalid(what: &str, value: &str) -> Error {
    Error::AtlasParse {
        message: format!("invalid {what}: {value}"),
    }
}

fn apply_page_entry(page: &mut AtlasPage, key: &str, value: &str) -> Result<(), Error> {
    match key {
        "size" => {
            let [w, h] = parse_ints::<u32, 2>(value).ok_or_else(|| invalid("page size", value))?;
            page.width = w;
            page.height = h;
        }
        "format" => page.format = value.to_string(),
        "filter" => {
            let (min, mag) = match value.split_once(',') {
                Some((a, b)) => (parse_filter(a.trim()), parse_filter(b.trim())),
                None => (parse_filter(value), parse_filter(value)),
            };
            page.min_filter = min;
            page.mag_filter = mag;
        }
        "repeat" => (page.wrap_u, page.wrap_v) = parse_repeat(value),
        _ => {}
    }
    Ok(())
}

fn apply_region_entry(region: &mut AtlasRegion, key: &str, value: &str) -> Result<(), Error> {
    match key {
        "rotate" => region.degrees = parse_degrees(value),
        "xy" => {
            [region.x, region.y] =
                parse_ints::<u32, 2>(value).ok_or_else(|| invalid("region xy", value))?;
        }
        "size" => {
            [region.width, region.height] =
                parse_ints::<u32, 2>(value).ok_or_else(|| invalid("region size", value))?;
        }
        "split" => {
            region.splits =
                Some(parse_ints::<i32, 4>(value).ok_or_else(|| invalid("region split", value))?);
        }
        "pad" => {
            region.pads =
                Some(parse_ints::<i32, 4>(value).ok_or_else(|| invalid("region pad", value))?);
        }
        "orig" => {
            [region.original_width, region.original_height] =
                parse_ints::<u32, 2>(value).ok_or_else(|| invalid("region orig", value))?;
        }
        "offset" => {
            [region.offset_x, region.offset_y] =
                parse_ints::<i32, 2>(value).ok_or_else(|| invalid("region offset", value))?;
        }
        "index" => {
            let [index] = parse_ints::<i32, 1>(value).ok_or_else(|| invalid("region index", value))?;
            region.index = index;
        }
        _ => {}
    }
    Ok(())
}

/// Parses exactly `N` comma-separated integers.
fn parse_ints<T: FromStr + Copy + Default, const N: usize>(value: &str) -> Option<[T; N]> {
    let mut out = [T::default(); N];
    let mut parts = value.split(',');
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

fn parse_degrees(value: &str) -> i32 {
    match value {
        "true" => 90,
        "false" => 0,
        _ => value.parse::<i32>().map(|d| d.rem_euclid(360)).unwrap_or(0),
    }
}

fn parse_filter(value: &str) -> AtlasFilter {
    match value {
        "Nearest" => AtlasFilter::Nearest,
        "Linear" => AtlasFilter::Linear,
        "MipMap" => AtlasFilter::MipMap,
        "MipMapNearestNearest" => AtlasFilter::MipMapNearestNearest,
        "MipMapNearestLinear" => AtlasFilter::MipMapNearestLinear,
        "MipMapLinearNearest" => AtlasFilter::MipMapLinearNearest,
        "MipMapLinearLinear" => AtlasFilter::MipMapLinearLinear,
        other => AtlasFilter::Other(other.to_string()),
    }
}

fn parse_repeat(value: &str) -> (AtlasWrap, AtlasWrap) {
    match value {
        "x" => (AtlasWrap::Repeat, AtlasWrap::ClampToEdge),
        "y" => (AtlasWrap::ClampToEdge, AtlasWrap::Repeat),
        "xy" => (AtlasWrap::Repeat, AtlasWrap::Repeat),
        _ => (AtlasWrap::ClampToEdge, AtlasWrap::ClampToEdge),
    }
}

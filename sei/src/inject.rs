use std::borrow::Cow;

use common::scan_nal_units;
use tracing::debug;
use uuid::Uuid;

use crate::errors::SeiError;
use crate::nal::build_sei_nal;

/// Where an injected SEI NAL unit goes inside an access unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    /// Ahead of every existing NAL unit.
    #[default]
    Prepend,
    /// After any leading access unit delimiter, SEI, SPS and PPS NAL units, ahead of the first
    /// coded slice. Without a slice the SEI goes after the last NAL unit.
    AfterParameterSets,
}

/// Keyframes always get metadata; other access units only when `period` is non-zero and divides
/// `au_index`.
pub fn should_inject(au_index: u64, is_keyframe: bool, period: u64) -> bool {
    is_keyframe || (period > 0 && au_index % period == 0)
}

/// Byte offset in `au` at which an SEI NAL unit is spliced for `placement`.
pub fn insertion_offset(au: &[u8], placement: Placement) -> usize {
    match placement {
        Placement::Prepend => 0,
        Placement::AfterParameterSets => {
            let mut offset = 0;
            for nal_unit in scan_nal_units(au) {
                if nal_unit.is_vcl() {
                    return nal_unit.offset;
                }
                offset = nal_unit.end();
            }
            offset
        }
    }
}

/// Splices a start-code-delimited `sei_nal` into `au`. `au` must be exactly one access unit.
pub fn splice_sei_nal(
    au: &[u8],
    sei_nal: &[u8],
    placement: Placement,
) -> Result<Vec<u8>, SeiError> {
    if au.is_empty() {
        return Err(SeiError::EmptyAccessUnit);
    }

    let offset = insertion_offset(au, placement);
    let mut out = Vec::with_capacity(au.len() + sei_nal.len());
    out.extend_from_slice(&au[..offset]);
    out.extend_from_slice(sei_nal);
    out.extend_from_slice(&au[offset..]);

    Ok(out)
}

/// Injects `user_data_unregistered` metadata into the access units of one sending session.
///
/// The injector owns the session's access unit counter. Calls from several threads must be
/// serialized by the caller; `inject` takes `&mut self` for that reason.
#[derive(Debug, Clone)]
pub struct SeiInjector {
    uuid: Uuid,
    period: u64,
    placement: Placement,
    au_index: u64,
}

impl SeiInjector {
    /// `period` 0 restricts injection to keyframes.
    pub fn new(uuid: Uuid, period: u64) -> Self {
        Self {
            uuid,
            period,
            placement: Placement::default(),
            au_index: 0,
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Index the next access unit handed to `inject` will get.
    pub fn au_index(&self) -> u64 {
        self.au_index
    }

    /// Starts a new session: the next access unit gets index 0.
    pub fn reset(&mut self) {
        self.au_index = 0;
    }

    /// Injects `body` into `au` if the policy selects this access unit, then advances the counter.
    pub fn inject<'a>(
        &mut self,
        au: &'a [u8],
        is_keyframe: bool,
        body: &[u8],
    ) -> Result<Cow<'a, [u8]>, SeiError> {
        self.inject_with(au, is_keyframe, |_| body)
    }

    /// Like [`SeiInjector::inject`], but only builds the body, from the access unit index, when
    /// the access unit is selected.
    pub fn inject_with<'a, F, B>(
        &mut self,
        au: &'a [u8],
        is_keyframe: bool,
        body: F,
    ) -> Result<Cow<'a, [u8]>, SeiError>
    where
        F: FnOnce(u64) -> B,
        B: AsRef<[u8]>,
    {
        let out = self.inject_at(au, self.au_index, is_keyframe, body)?;
        self.au_index += 1;
        Ok(out)
    }

    /// Stateless form: the caller supplies `au_index` and the counter is left alone.
    pub fn inject_at<'a, F, B>(
        &self,
        au: &'a [u8],
        au_index: u64,
        is_keyframe: bool,
        body: F,
    ) -> Result<Cow<'a, [u8]>, SeiError>
    where
        F: FnOnce(u64) -> B,
        B: AsRef<[u8]>,
    {
        if au.is_empty() {
            return Err(SeiError::EmptyAccessUnit);
        }

        if !should_inject(au_index, is_keyframe, self.period) {
            return Ok(Cow::Borrowed(au));
        }

        let sei_nal = build_sei_nal(&self.uuid, body(au_index).as_ref());
        let out = splice_sei_nal(au, &sei_nal, self.placement)?;
        debug!(
            au_index,
            is_keyframe,
            sei_len = sei_nal.len(),
            au_len = au.len(),
            placement = ?self.placement,
            "injected SEI"
        );

        Ok(Cow::Owned(out))
    }
}

#[cfg(test)]
mod tests {
    use common::nal_unit_types;

    use super::*;

    const AU: [u8; 18] = [
        0x00, 0x00, 0x00, 0x01, 0x09, 0xf0, // AUD
        0x00, 0x00, 0x01, 0x67, 0x42, // SPS
        0x00, 0x00, 0x01, 0x68, 0xce, // PPS
        0x00, 0x00,
    ];

    fn idr_au() -> Vec<u8> {
        let mut au = AU.to_vec();
        au.extend_from_slice(&[0x01, 0x65, 0x88, 0x84]);
        au
    }

    #[test]
    fn test_should_inject() {
        assert!(!should_inject(0, false, 0));
        assert!(should_inject(10, false, 5));
        assert!(should_inject(1, true, 100));
        assert!(!should_inject(7, false, 5));
        assert!(should_inject(0, false, 1));
    }

    #[test]
    fn test_prepend() {
        let au = idr_au();
        let mut injector = SeiInjector::new(Uuid::nil(), 0);

        let out = injector.inject(&au, true, b"meta").unwrap();
        assert!(matches!(out, Cow::Owned(_)));
        assert_eq!(nal_unit_types(&out), vec![6, 9, 7, 8, 5]);
        assert!(out.ends_with(&au));
    }

    #[test]
    fn test_after_parameter_sets() {
        let au = idr_au();
        let mut injector =
            SeiInjector::new(Uuid::nil(), 0).with_placement(Placement::AfterParameterSets);
        assert_eq!(insertion_offset(&au, Placement::AfterParameterSets), 16);

        let out = injector.inject(&au, true, b"meta").unwrap();
        assert_eq!(nal_unit_types(&out), vec![9, 7, 8, 6, 5]);
        assert!(out.starts_with(&au[..16]));
        assert!(out.ends_with(&au[16..]));
    }

    #[test]
    fn test_after_parameter_sets_without_slice() {
        assert_eq!(insertion_offset(&AU, Placement::AfterParameterSets), AU.len());
        assert_eq!(insertion_offset(&[0xaa, 0xbb], Placement::AfterParameterSets), 0);
    }

    #[test]
    fn test_skipped_access_unit_is_borrowed() {
        let au = idr_au();
        let mut injector = SeiInjector::new(Uuid::nil(), 3);

        let first = injector.inject(&au, false, b"x").unwrap();
        assert!(matches!(first, Cow::Owned(_)));
        let second = injector.inject(&au, false, b"x").unwrap();
        assert!(matches!(second, Cow::Borrowed(_)));
        assert_eq!(&*second, &au[..]);
        assert_eq!(injector.au_index(), 2);
    }

    #[test]
    fn test_counter_and_reset() {
        let au = idr_au();
        let mut injector = SeiInjector::new(Uuid::nil(), 2);
        let mut seen = vec![];

        for _ in 0..5 {
            injector
                .inject_with(&au, false, |idx| {
                    seen.push(idx);
                    idx.to_string()
                })
                .unwrap();
        }
        assert_eq!(seen, vec![0, 2, 4]);
        assert_eq!(injector.au_index(), 5);

        injector.reset();
        assert_eq!(injector.au_index(), 0);
    }

    #[test]
    fn test_empty_access_unit_rejected() {
        let mut injector = SeiInjector::new(Uuid::nil(), 1);
        assert!(matches!(
            injector.inject(&[], true, b"x"),
            Err(SeiError::EmptyAccessUnit)
        ));
        assert_eq!(injector.au_index(), 0);
        assert!(matches!(
            splice_sei_nal(&[], &[0x00, 0x00, 0x01, 0x06], Placement::Prepend),
            Err(SeiError::EmptyAccessUnit)
        ));
    }
}

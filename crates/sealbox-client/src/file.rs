//! Upload, download and append over sealed, anchored segments

use sealbox_core::{SealboxError, SealboxResult};
use sealbox_crypto::{envelope, Address, Anchor, SymmetricKey};

use crate::graph::AccessGraph;
use crate::records::{
    segment_address, segment_context, EpochKey, FileEntry, FileHeader, SegmentBody,
    SegmentRecord, RECORD_VERSION,
};
use crate::session::{OpenFile, Session};

fn validate_filename(filename: &str) -> SealboxResult<()> {
    if filename.is_empty() {
        return Err(SealboxError::InvalidInput("filename must not be empty".into()));
    }
    Ok(())
}

fn new_generation() -> [u8; 16] {
    rand::random()
}

impl Session {
    /// Store `data` as `filename`.
    ///
    /// A new file gets fresh keys and this user as owner. An existing one,
    /// owned or received, is replaced in place: same header address, same
    /// keys and access graph, so every collaborator sees the new content.
    pub async fn upload(&self, filename: &str, data: &[u8]) -> SealboxResult<()> {
        validate_filename(filename)?;
        match self.resolve(filename).await {
            Ok(open) => self.overwrite(filename, open, data).await,
            Err(SealboxError::FileNotFound(_)) => self.create_file(filename, data).await,
            Err(e) => Err(e),
        }
    }

    async fn create_file(&self, filename: &str, data: &[u8]) -> SealboxResult<()> {
        let access_key = SymmetricKey::generate();
        let anchor_key = SymmetricKey::generate();
        let content_key = SymmetricKey::generate();
        let generation = new_generation();

        let blob = self.write_segment(&generation, 0, 0, &content_key, data).await?;
        let header = FileHeader {
            version: RECORD_VERSION,
            owner: self.username.clone(),
            generation,
            segment_count: 1,
            anchor: Anchor::genesis(&anchor_key, &generation).extend(&anchor_key, 0, &blob),
            anchor_key,
            epoch: 0,
            keyring: vec![EpochKey {
                epoch: 0,
                key: content_key,
            }],
            graph: AccessGraph::default(),
        };

        // The entry is the commit point; a crash before it leaves only
        // unreachable blobs behind.
        let header_address = Address::random();
        self.store_header(&header_address, &access_key, &header).await?;
        self.store_entry(
            filename,
            &FileEntry::Owned {
                header: header_address,
                access_key,
            },
        )
        .await?;
        self.add_to_index(filename).await?;

        tracing::debug!(user = %self.username, file = %filename, len = data.len(), "file created");
        Ok(())
    }

    async fn overwrite(&self, filename: &str, open: OpenFile, data: &[u8]) -> SealboxResult<()> {
        let OpenFile {
            header_address,
            access_key,
            mut header,
            ..
        } = open;
        let old_generation = header.generation;
        let old_count = header.segment_count;

        let generation = new_generation();
        let epoch = header.epoch;
        let blob = self
            .write_segment(&generation, 0, epoch, header.current_key()?, data)
            .await?;

        header.generation = generation;
        header.segment_count = 1;
        header.anchor =
            Anchor::genesis(&header.anchor_key, &generation).extend(&header.anchor_key, 0, &blob);
        self.store_header(&header_address, &access_key, &header).await?;

        for seq in 0..old_count {
            let addr = segment_address(&old_generation, seq);
            if let Err(e) = self.blobs.delete(&addr).await {
                tracing::warn!(file = %filename, seq, error = %e, "failed to delete superseded segment");
            }
        }

        tracing::debug!(user = %self.username, file = %filename, len = data.len(), "file overwritten");
        Ok(())
    }

    /// Full contents of `filename`, verified segment by segment and against
    /// the header's anchor.
    pub async fn download(&self, filename: &str) -> SealboxResult<Vec<u8>> {
        validate_filename(filename)?;
        let OpenFile { header, .. } = self.resolve(filename).await?;

        let mut anchor = Anchor::genesis(&header.anchor_key, &header.generation);
        let mut out = Vec::new();
        for seq in 0..header.segment_count {
            let address = segment_address(&header.generation, seq);
            let blob = self.blobs.get(&address).await?.ok_or_else(|| {
                SealboxError::integrity(format!("segment {seq} of {filename} missing"))
            })?;
            anchor = anchor.extend(&header.anchor_key, seq, &blob);

            let record: SegmentRecord = serde_json::from_slice(&blob).map_err(|e| {
                SealboxError::integrity(format!("segment {seq} of {filename}: {e}"))
            })?;
            let key = header.epoch_key(record.epoch).ok_or_else(|| {
                SealboxError::integrity(format!(
                    "segment {seq} of {filename} claims unknown epoch {}",
                    record.epoch
                ))
            })?;
            let body: SegmentBody = envelope::open_with(
                key,
                &address,
                &segment_context(record.epoch, seq),
                &record.sealed,
            )?;
            if body.seq != seq {
                return Err(SealboxError::integrity(format!(
                    "segment {seq} of {filename} carries sequence number {}",
                    body.seq
                )));
            }
            out.extend_from_slice(&body.data);
        }

        if !anchor.ct_eq(&header.anchor) {
            return Err(SealboxError::integrity(format!(
                "anchor mismatch for {filename}"
            )));
        }

        // A segment past the end is either a crashed append or an older header
        // written back by the store; the content cannot tell them apart.
        let next = segment_address(&header.generation, header.segment_count);
        if self.blobs.get(&next).await?.is_some() {
            tracing::warn!(
                target: "sealbox::tamper",
                user = %self.username,
                file = %filename,
                segments = header.segment_count,
                "segment beyond the recorded end, header may have been rolled back"
            );
        }

        tracing::debug!(user = %self.username, file = %filename, segments = header.segment_count, "file downloaded");
        Ok(out)
    }

    /// Add `data` to the end of `filename`.
    ///
    /// Touches only the header and the new segment, whatever the file size.
    pub async fn append(&self, filename: &str, data: &[u8]) -> SealboxResult<()> {
        validate_filename(filename)?;
        let OpenFile {
            header_address,
            access_key,
            mut header,
            ..
        } = self.resolve(filename).await?;

        let seq = header.segment_count;
        let epoch = header.epoch;
        let blob = self
            .write_segment(&header.generation, seq, epoch, header.current_key()?, data)
            .await?;

        header.anchor = header.anchor.extend(&header.anchor_key, seq, &blob);
        header.segment_count += 1;
        self.store_header(&header_address, &access_key, &header).await?;

        tracing::debug!(user = %self.username, file = %filename, seq, epoch, len = data.len(), "segment appended");
        Ok(())
    }

    /// Seal one segment and store it. Returns the stored bytes, which the
    /// anchor covers.
    async fn write_segment(
        &self,
        generation: &[u8; 16],
        seq: u64,
        epoch: u32,
        key: &SymmetricKey,
        data: &[u8],
    ) -> SealboxResult<Vec<u8>> {
        let address = segment_address(generation, seq);
        let body = SegmentBody {
            seq,
            data: data.to_vec(),
        };
        let sealed = envelope::seal_with(key, &address, &segment_context(epoch, seq), &body)?;
        let blob = serde_json::to_vec(&SegmentRecord { epoch, sealed })
            .map_err(|e| anyhow::anyhow!("encoding segment record: {e}"))?;
        self.blobs.put(&address, blob.clone()).await?;
        Ok(blob)
    }
}

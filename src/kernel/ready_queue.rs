use std::collections::VecDeque;

use super::{Pid, ProcessControlBlock};

/// FIFO of processes waiting for the CPU.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    queue: VecDeque<ProcessControlBlock>,
}

impl ReadyQueue {
    pub fn new() -> ReadyQueue {
        ReadyQueue {
            queue: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, pcb: ProcessControlBlock) {
        self.queue.push_back(pcb);
    }

    pub fn dequeue(&mut self) -> Option<ProcessControlBlock> {
        self.queue.pop_front()
    }

    pub fn remove(&mut self, pid: Pid) -> Option<ProcessControlBlock> {
        let index = self.queue.iter().position(|pcb| pcb.get_id() == pid)?;
        self.queue.remove(index)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.queue.iter().any(|pcb| pcb.get_id() == pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessControlBlock> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(queue: &ReadyQueue) -> Vec<Pid> {
        queue.iter().map(|pcb| pcb.get_id()).collect()
    }

    #[test]
    fn test_ready_queue_enqueue_then_dequeue_in_order() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(ProcessControlBlock::new(1, 0));
        queue.enqueue(ProcessControlBlock::new(2, 1));

        assert_eq!(queue.dequeue().map(|pcb| pcb.get_id()), Some(1));
        assert_eq!(queue.dequeue().map(|pcb| pcb.get_id()), Some(2));
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_ready_queue_remove_keeps_order() {
        let mut queue = ReadyQueue::new();
        for pid in 0..3 {
            queue.enqueue(ProcessControlBlock::new(pid, pid as usize));
        }

        assert_eq!(queue.remove(1).map(|pcb| pcb.get_id()), Some(1));
        assert!(queue.remove(7).is_none());
        assert_eq!(ids(&queue), vec![0, 2]);
        assert!(!queue.contains(1));
    }
}
